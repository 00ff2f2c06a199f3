use std::{
    io, thread,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::{
    channel::{Channel, Recv},
    layer::{BuildError, DEFAULT_MAX_PACKET},
    protocol::{EncodingError, Packet, PACKET_HDR_LEN},
    utils::Seq,
};

use super::policy::{RetransmissionPolicy, RetransmitTimer};

/// Sending half of a stop-and-wait transfer.
///
/// Holds configuration only. Sequence number and round-trip history live in
/// the frame of each [`Sender::send`] call, so one sender can drive any
/// number of transfers, one after another or in parallel.
#[derive(Debug, Clone)]
pub struct Sender {
    max_packet: usize,
    policy: RetransmissionPolicy,
    max_retransmissions: Option<u32>,
}

pub struct SenderBuilder {
    pub max_packet: usize,
    pub policy: RetransmissionPolicy,
    /// Per packet; `None` retries forever.
    pub max_retransmissions: Option<u32>,
}

impl SenderBuilder {
    pub fn build(self) -> Result<Sender, BuildError> {
        if self.max_packet <= PACKET_HDR_LEN {
            return Err(BuildError::MaxPacketTooSmall(self.max_packet));
        }
        self.policy.check()?;
        let this = Sender {
            max_packet: self.max_packet,
            policy: self.policy,
            max_retransmissions: self.max_retransmissions,
        };
        this.check_rep();
        Ok(this)
    }
}

impl Default for SenderBuilder {
    fn default() -> Self {
        SenderBuilder {
            max_packet: DEFAULT_MAX_PACKET,
            policy: RetransmissionPolicy::default(),
            max_retransmissions: None,
        }
    }
}

impl Default for Sender {
    fn default() -> Self {
        let builder = SenderBuilder::default();
        Sender {
            max_packet: builder.max_packet,
            policy: builder.policy,
            max_retransmissions: builder.max_retransmissions,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("channel failed: {0}")]
    Channel(#[from] io::Error),
    #[error("channel closed by the peer")]
    Closed,
    #[error("packet {seq} unacknowledged after {retransmissions} retransmissions")]
    RetriesExhausted { seq: Seq, retransmissions: u32 },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl Sender {
    #[inline]
    fn check_rep(&self) {
        assert!(self.max_packet > PACKET_HDR_LEN);
    }

    #[must_use]
    #[inline]
    pub fn max_packet(&self) -> usize {
        self.max_packet
    }

    #[must_use]
    #[inline]
    pub fn max_payload(&self) -> usize {
        self.max_packet - PACKET_HDR_LEN
    }

    #[must_use]
    #[inline]
    pub fn policy(&self) -> &RetransmissionPolicy {
        &self.policy
    }

    /// Delivers `data` to the receiver on the other end of `channel`.
    ///
    /// Returns once every packet is acknowledged. An `Err` means the transfer
    /// stopped early; how much of `data` arrived is unknown.
    #[tracing::instrument(skip(self, channel, data), fields(len = data.len(), max_packet = self.max_packet))]
    pub fn send<C>(&self, channel: &mut C, data: &[u8]) -> Result<Stat, Error>
    where
        C: Channel + ?Sized,
    {
        let mut transfer = Transfer {
            timer: self.policy.timer(),
            seq: Seq::ZERO,
            buf: vec![0; self.max_packet],
            stat: Stat::default(),
        };
        let before = Instant::now();

        for chunk in data.chunks(self.max_payload()) {
            let datagram = Packet::data(transfer.seq, chunk).encode(self.max_packet)?;
            if let Err(e) = self.deliver(channel, &datagram, &mut transfer) {
                error!(seq = %transfer.seq, "transfer aborted: {}", e);
                return Err(e);
            }
            transfer.seq.flip();
            if let Some(pacing) = self.policy.pacing() {
                thread::sleep(pacing);
            }
        }

        transfer.stat.rto = transfer.timer.rto();
        info!(
            elapsed = ?before.elapsed(),
            pushes = transfer.stat.pushes,
            retransmissions = transfer.stat.retransmissions,
            rto = ?transfer.stat.rto,
            "transfer complete"
        );
        Ok(transfer.stat)
    }

    /// Sends one packet and blocks until it is acknowledged.
    fn deliver<C>(
        &self,
        channel: &mut C,
        datagram: &[u8],
        transfer: &mut Transfer<'_>,
    ) -> Result<(), Error>
    where
        C: Channel + ?Sized,
    {
        let seq = transfer.seq;
        channel.send(datagram)?;
        transfer.stat.pushes += 1;
        debug!(%seq, len = datagram.len(), "sent");

        let mut retransmissions = 0;
        let mut sent_at = Instant::now();
        loop {
            let remaining = transfer.timer.rto().saturating_sub(sent_at.elapsed());
            let received = if remaining.is_zero() {
                Recv::TimedOut
            } else {
                channel.recv(&mut transfer.buf, Some(remaining))?
            };

            match received {
                Recv::Datagram(0) => return Err(Error::Closed),
                Recv::Datagram(len) => match Packet::from_bytes(&transfer.buf[..len]) {
                    Ok(packet) if packet.is_ack_for(seq) => {
                        // measured from the latest copy
                        let rtt = sent_at.elapsed();
                        if transfer.timer.on_ack(rtt, retransmissions > 0) {
                            transfer.stat.rtt_samples += 1;
                        }
                        transfer.stat.acks += 1;
                        debug!(%seq, ?rtt, rto = ?transfer.timer.rto(), "acked");
                        return Ok(());
                    }
                    Ok(packet) => {
                        transfer.stat.ignored += 1;
                        trace!(
                            %seq,
                            ty = ?packet.hdr().ty(),
                            got = %packet.hdr().seq(),
                            "ignored packet while waiting for ack"
                        );
                    }
                    Err(e) => {
                        transfer.stat.decoding_errors += 1;
                        warn!(%seq, "dropped malformed datagram: {}", e);
                    }
                },
                Recv::TimedOut => {
                    transfer.stat.rto_hits += 1;
                    if let Some(max) = self.max_retransmissions {
                        if retransmissions >= max {
                            return Err(Error::RetriesExhausted {
                                seq,
                                retransmissions,
                            });
                        }
                    }
                    if transfer.timer.on_timeout(sent_at.elapsed()) {
                        transfer.stat.rtt_samples += 1;
                    }

                    channel.send(datagram)?;
                    retransmissions += 1;
                    transfer.stat.retransmissions += 1;
                    sent_at = Instant::now();
                    debug!(%seq, rto = ?transfer.timer.rto(), "retransmitted");
                }
            }
        }
    }
}

/// State of one `send` call.
struct Transfer<'a> {
    timer: RetransmitTimer<'a>,
    seq: Seq,
    buf: Vec<u8>,
    stat: Stat,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stat {
    /// Packets sent for the first time.
    pub pushes: u64,
    pub retransmissions: u64,
    /// Waits that ran out without a matching ack.
    pub rto_hits: u64,
    pub acks: u64,
    /// Well-formed packets that were not the awaited ack.
    pub ignored: u64,
    pub decoding_errors: u64,
    pub rtt_samples: u64,
    /// Timeout armed when the transfer ended.
    pub rto: Duration,
}
