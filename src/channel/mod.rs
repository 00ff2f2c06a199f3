//! Unreliable datagram transports the ARQ layer runs on.
//!
//! A [`Channel`] may lose, delay or duplicate datagrams. The only guarantees
//! are that a datagram is delivered whole or not at all and that a
//! zero-length read means the other side is gone.

use std::{io, time::Duration};

pub mod lossy;
pub mod sim;
pub mod udp;

pub use lossy::{DropPolicy, Lossy};
pub use udp::UdpChannel;

/// Outcome of a successful [`Channel::recv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recv {
    /// Length of the datagram copied into the buffer. `0` means closed.
    Datagram(usize),
    TimedOut,
}

pub trait Channel {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// Blocks until a datagram arrives or `timeout` runs out.
    ///
    /// `None` waits forever. A datagram longer than `buf` is truncated.
    /// `Err` is fatal for the transfer.
    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<Recv>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        (**self).send(datagram)
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<Recv> {
        (**self).recv(buf, timeout)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        (**self).send(datagram)
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<Recv> {
        (**self).recv(buf, timeout)
    }
}
