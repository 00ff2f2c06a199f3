use std::{
    io::{self, Write},
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::{
    channel::{Channel, Recv},
    protocol::{Packet, PacketType, PACKET_HDR_LEN},
    utils::Seq,
};

use super::{BuildError, DEFAULT_MAX_PACKET};

/// Receiving half of a stop-and-wait transfer.
#[derive(Debug, Clone)]
pub struct Receiver {
    max_packet: usize,
    idle_timeout: Option<Duration>,
}

pub struct ReceiverBuilder {
    pub max_packet: usize,
    /// Bound on each blocking read; expiry is logged and the read retried.
    pub idle_timeout: Option<Duration>,
}

impl ReceiverBuilder {
    pub fn build(self) -> Result<Receiver, BuildError> {
        if self.max_packet <= PACKET_HDR_LEN {
            return Err(BuildError::MaxPacketTooSmall(self.max_packet));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(BuildError::InvalidTimeoutRange);
        }
        let this = Receiver {
            max_packet: self.max_packet,
            idle_timeout: self.idle_timeout,
        };
        this.check_rep();
        Ok(this)
    }
}

impl Default for ReceiverBuilder {
    fn default() -> Self {
        ReceiverBuilder {
            max_packet: DEFAULT_MAX_PACKET,
            idle_timeout: None,
        }
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Receiver {
            max_packet: DEFAULT_MAX_PACKET,
            idle_timeout: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("channel failed: {0}")]
    Channel(#[source] io::Error),
    #[error("sink failed: {0}")]
    Sink(#[source] io::Error),
}

impl Receiver {
    #[inline]
    fn check_rep(&self) {
        assert!(self.max_packet > PACKET_HDR_LEN);
    }

    #[must_use]
    #[inline]
    pub fn max_packet(&self) -> usize {
        self.max_packet
    }

    /// Writes every in-order payload arriving on `channel` to `sink` exactly
    /// once, until the channel closes or fails.
    ///
    /// A payload is flushed before it is acknowledged. `Stat::bytes` counts
    /// what reached the sink even when the transfer stopped on an error.
    #[tracing::instrument(skip(self, channel, sink), fields(max_packet = self.max_packet))]
    pub fn recv<C, W>(&self, channel: &mut C, sink: &mut W) -> Stat
    where
        C: Channel + ?Sized,
        W: Write + ?Sized,
    {
        let mut stat = Stat::default();
        let mut expected = Seq::ZERO;
        let mut buf = vec![0; self.max_packet];

        loop {
            let len = match channel.recv(&mut buf, self.idle_timeout) {
                Ok(Recv::Datagram(0)) => break,
                Ok(Recv::Datagram(len)) => len,
                Ok(Recv::TimedOut) => {
                    stat.timeouts += 1;
                    info!(%expected, "timed out during reception");
                    continue;
                }
                Err(e) => {
                    error!("channel failed: {}", e);
                    stat.error = Some(Error::Channel(e));
                    break;
                }
            };

            let packet = match Packet::from_bytes(&buf[..len]) {
                Ok(x) => x,
                Err(e) => {
                    stat.decoding_errors += 1;
                    warn!(len, "dropped malformed datagram: {}", e);
                    continue;
                }
            };

            let seq = packet.hdr().seq();
            let result = match packet.hdr().ty() {
                PacketType::Data if seq == expected => {
                    let body = packet.body();
                    if let Err(e) = sink.write_all(body).and_then(|_| sink.flush()) {
                        error!(%seq, "sink failed: {}", e);
                        stat.error = Some(Error::Sink(e));
                        break;
                    }
                    stat.bytes += body.len();
                    stat.delivered += 1;
                    debug!(%seq, len = body.len(), "delivered");
                    expected.flip();
                    ack(channel, seq)
                }
                PacketType::Data => {
                    // the ack for the previous packet was lost
                    stat.duplicates += 1;
                    debug!(%seq, %expected, "duplicate packet, acking again");
                    ack(channel, seq)
                }
                PacketType::Ack => {
                    stat.ignored_acks += 1;
                    trace!(%seq, "ignored ack");
                    Ok(())
                }
            };
            if let Err(e) = result {
                error!(%seq, "channel failed: {}", e);
                stat.error = Some(Error::Channel(e));
                break;
            }
        }

        info!(
            bytes = stat.bytes,
            delivered = stat.delivered,
            duplicates = stat.duplicates,
            "reception finished"
        );
        stat
    }
}

fn ack<C>(channel: &mut C, seq: Seq) -> io::Result<()>
where
    C: Channel + ?Sized,
{
    let mut datagram = Vec::with_capacity(PACKET_HDR_LEN);
    Packet::ack(seq).append_to(&mut datagram);
    channel.send(&datagram)?;
    trace!(%seq, "sent ack");
    Ok(())
}

#[derive(Debug, Default)]
pub struct Stat {
    /// Payload bytes written to the sink.
    pub bytes: usize,
    pub delivered: u64,
    /// Data packets for the already delivered sequence number.
    pub duplicates: u64,
    pub ignored_acks: u64,
    pub decoding_errors: u64,
    pub timeouts: u64,
    /// Why the transfer stopped, if not because the channel closed.
    pub error: Option<Error>,
}
