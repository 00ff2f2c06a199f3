use std::{io, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

use super::{Channel, Recv};

/// Which outgoing datagrams a [`Lossy`] channel throws away.
///
/// Indices count every datagram handed to `send`, retransmissions included,
/// starting at `0`.
#[derive(Debug, Clone, PartialEq)]
pub enum DropPolicy {
    Never,
    /// Drop exactly these indices.
    Indices(Vec<u64>),
    /// Drop indices `k - 1`, `2k - 1`, ... ; `k` below 2 drops nothing.
    EveryKth(u64),
    /// Drop each datagram with probability `rate`.
    Random { rate: f64, seed: u64 },
}

/// Wraps a channel and drops outgoing datagrams according to a [`DropPolicy`].
pub struct Lossy<C> {
    inner: C,
    policy: DropPolicy,
    rng: StdRng,
    sent: u64,
    dropped: u64,
}

impl<C: Channel> Lossy<C> {
    pub fn new(inner: C, policy: DropPolicy) -> Self {
        let seed = match &policy {
            DropPolicy::Random { seed, .. } => *seed,
            _ => 0,
        };
        Lossy {
            inner,
            policy,
            rng: StdRng::seed_from_u64(seed),
            sent: 0,
            dropped: 0,
        }
    }

    /// Datagrams handed to `send`, dropped ones included.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[must_use]
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn should_drop(&mut self, index: u64) -> bool {
        match &self.policy {
            DropPolicy::Never => false,
            DropPolicy::Indices(indices) => indices.contains(&index),
            DropPolicy::EveryKth(k) => *k >= 2 && (index + 1) % k == 0,
            DropPolicy::Random { rate, .. } => {
                let rate = rate.clamp(0.0, 1.0);
                self.rng.gen_bool(rate)
            }
        }
    }
}

impl<C: Channel> Channel for Lossy<C> {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let index = self.sent;
        self.sent += 1;
        if self.should_drop(index) {
            self.dropped += 1;
            trace!(index, len = datagram.len(), "datagram dropped");
            return Ok(());
        }
        self.inner.send(datagram)
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<Recv> {
        self.inner.recv(buf, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::sim::{pair, LinkConfig};

    fn drain(end: &mut impl Channel) -> Vec<u8> {
        let mut got = Vec::new();
        let mut buf = [0; 8];
        while let Recv::Datagram(1) = end.recv(&mut buf, Some(Duration::from_millis(20))).unwrap()
        {
            got.push(buf[0]);
        }
        got
    }

    #[test]
    fn every_kth() {
        let (a, mut b) = pair(LinkConfig::default());
        let mut a = Lossy::new(a, DropPolicy::EveryKth(3));
        for i in 0..7 {
            a.send(&[i]).unwrap();
        }
        assert_eq!(a.sent(), 7);
        assert_eq!(a.dropped(), 2);
        assert_eq!(drain(&mut b), vec![0, 1, 3, 4, 6]);
    }

    #[test]
    fn indices() {
        let (a, mut b) = pair(LinkConfig::default());
        let mut a = Lossy::new(a, DropPolicy::Indices(vec![0, 2]));
        for i in 0..4 {
            a.send(&[i]).unwrap();
        }
        assert_eq!(drain(&mut b), vec![1, 3]);
    }

    #[test]
    fn every_kth_below_two_drops_nothing() {
        let (a, mut b) = pair(LinkConfig::default());
        let mut a = Lossy::new(a, DropPolicy::EveryKth(1));
        for i in 0..3 {
            a.send(&[i]).unwrap();
        }
        assert_eq!(drain(&mut b), vec![0, 1, 2]);
    }

    #[test]
    fn random_is_reproducible() {
        let run = || {
            let (a, mut b) = pair(LinkConfig::default());
            let mut a = Lossy::new(a, DropPolicy::Random { rate: 0.5, seed: 42 });
            for i in 0..32 {
                a.send(&[i]).unwrap();
            }
            drain(&mut b)
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.len() < 32);
        assert!(!first.is_empty());
    }
}
