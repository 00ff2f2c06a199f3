use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    time::{Duration, Instant},
};

use tracing::{info, trace};

use super::{Channel, Recv};

/// A [`Channel`] over a std `UdpSocket`.
///
/// Without a configured peer the channel latches onto the source of the
/// first datagram it receives; datagrams from anyone else are dropped after
/// that.
#[derive(Debug)]
pub struct UdpChannel {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl UdpChannel {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(UdpChannel { socket, peer: None })
    }

    pub fn connect(&mut self, peer: impl ToSocketAddrs) -> io::Result<()> {
        let peer = peer.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "peer resolved to no address")
        })?;
        self.peer = Some(peer);
        Ok(())
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    #[must_use]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Channel for UdpChannel {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let peer = self
            .peer
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no peer yet"))?;
        self.socket.send_to(datagram, peer)?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<Recv> {
        // `set_read_timeout` rejects a zero duration
        if timeout == Some(Duration::ZERO) {
            return Ok(Recv::TimedOut);
        }
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(Recv::TimedOut);
                    }
                    Some(remaining)
                }
                None => None,
            };
            self.socket.set_read_timeout(remaining)?;
            let (len, from) = match self.socket.recv_from(buf) {
                Ok(x) => x,
                Err(e) => match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                        return Ok(Recv::TimedOut)
                    }
                    io::ErrorKind::Interrupted => continue,
                    _ => return Err(e),
                },
            };
            match self.peer {
                Some(peer) if peer != from => {
                    trace!(%from, "dropped datagram from another address");
                    continue;
                }
                Some(_) => (),
                None => {
                    info!(%from, "latched onto peer");
                    self.peer = Some(from);
                }
            }
            return Ok(Recv::Datagram(len));
        }
    }
}
