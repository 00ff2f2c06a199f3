//! Stop-and-wait ARQ: reliable, in-order, exactly-once delivery of a byte
//! buffer over a channel that loses and delays datagrams.
//!
//! ```text
//!  ┌──────────┐   Data(seq)   ┌──────────┐
//!  │  Sender  │──────────────▶│ Receiver │──▶ sink
//!  │          │◀──────────────│          │
//!  └──────────┘    Ack(seq)   └──────────┘
//! ```
//!
//! - [`protocol`]: wire format
//! - [`layer`]: sender and receiver state machines and retransmission policy
//! - [`channel`]: the datagram transports they run on
//! - [`config`]: JSON configuration

use std::io::Write;

pub mod channel;
pub mod config;
pub mod layer;
pub mod protocol;
pub mod utils;

pub use channel::{Channel, Recv};
pub use layer::{Builder, Receiver, RetransmissionPolicy, Sender};

/// Sends `data` with the default configuration.
pub fn send<C>(channel: &mut C, data: &[u8]) -> Result<layer::sender::Stat, layer::sender::Error>
where
    C: Channel + ?Sized,
{
    Sender::default().send(channel, data)
}

/// Receives with the default configuration and returns the number of bytes
/// written to `sink`.
pub fn recv<C, W>(channel: &mut C, sink: &mut W) -> usize
where
    C: Channel + ?Sized,
    W: Write + ?Sized,
{
    Receiver::default().recv(channel, sink).bytes
}
