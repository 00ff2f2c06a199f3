//! # Packet header
//!
//! ```text
//! 0       2       4                 (BYTE)
//! +-------+-------+
//! | type  |  seq  |
//! +-------+-------+
//! |               |
//! | Body (Data)   |
//! |               |
//! +---------------+
//! ```
//!
//! Both header fields are big-endian `u16`.
//!
//! # Invariants
//!
//! - `type` is `0` (Data) or `1` (Ack)
//! - `seq` is `0` or `1`
//! - `Ack` packets carry no body
//! - a packet never exceeds the configured maximum packet size
//!
//! No checksum is carried. A corrupted body behind a valid header is accepted
//! as data; an integrity check would live in [`packet::Packet::from_bytes`].

use thiserror::Error;

pub mod packet;
pub mod packet_hdr;

pub use packet::*;
pub use packet_hdr::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodingError {
    #[error("datagram of {len} bytes is shorter than the packet header")]
    TooShort { len: usize },
    #[error("unknown packet type {0}")]
    UnknownType(u16),
    #[error("sequence number {0} is not a single bit")]
    InvalidSeq(u16),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("packet of {len} bytes exceeds the maximum packet size {max}")]
    TooLarge { len: usize, max: usize },
}
