//! In-memory datagram link for tests and the loopback demo.
//!
//! [`pair`] returns two connected ends. Each direction delivers datagrams in
//! order after a fixed one-way delay. Dropping an end closes the link: the
//! other end reads a zero-length datagram once everything in flight has been
//! drained, and its sends vanish like datagrams to an unbound port.

use std::{
    io,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use super::{Channel, Recv};

#[derive(Debug, Clone, Default)]
pub struct LinkConfig {
    /// One-way delay, applied in both directions.
    pub delay: Duration,
}

/// Every datagram an end put on the link, in send order.
#[derive(Debug, Clone, Default)]
pub struct WireLog {
    datagrams: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl WireLog {
    fn record(&self, datagram: &[u8]) {
        if let Ok(mut datagrams) = self.datagrams.lock() {
            datagrams.push(datagram.to_vec());
        }
    }

    #[must_use]
    pub fn datagrams(&self) -> Vec<Vec<u8>> {
        match self.datagrams.lock() {
            Ok(datagrams) => datagrams.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

struct Flight {
    deliver_at: Instant,
    bytes: Vec<u8>,
}

pub struct SimEnd {
    tx: mpsc::Sender<Flight>,
    rx: mpsc::Receiver<Flight>,
    delay: Duration,
    pending: Option<Flight>,
    log: Option<WireLog>,
}

#[must_use]
pub fn pair(config: LinkConfig) -> (SimEnd, SimEnd) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    let a = SimEnd {
        tx: a_tx,
        rx: a_rx,
        delay: config.delay,
        pending: None,
        log: None,
    };
    let b = SimEnd {
        tx: b_tx,
        rx: b_rx,
        delay: config.delay,
        pending: None,
        log: None,
    };
    (a, b)
}

impl SimEnd {
    /// Starts recording outgoing datagrams.
    pub fn tap(&mut self) -> WireLog {
        let log = WireLog::default();
        self.log = Some(log.clone());
        log
    }

    fn deliver(flight: Flight, buf: &mut [u8]) -> Recv {
        let len = flight.bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&flight.bytes[..len]);
        Recv::Datagram(len)
    }
}

impl Channel for SimEnd {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        if let Some(log) = &self.log {
            log.record(datagram);
        }
        let flight = Flight {
            deliver_at: Instant::now() + self.delay,
            bytes: datagram.to_vec(),
        };
        // the peer hung up; the datagram is lost
        let _ = self.tx.send(flight);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<Recv> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let flight = match self.pending.take() {
            Some(flight) => flight,
            None => {
                let received = match deadline {
                    Some(deadline) => self
                        .rx
                        .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                    None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                match received {
                    Ok(flight) => flight,
                    Err(RecvTimeoutError::Timeout) => return Ok(Recv::TimedOut),
                    Err(RecvTimeoutError::Disconnected) => return Ok(Recv::Datagram(0)),
                }
            }
        };

        let now = Instant::now();
        match deadline {
            Some(deadline) if deadline < flight.deliver_at => {
                thread::sleep(deadline.saturating_duration_since(now));
                self.pending = Some(flight);
                Ok(Recv::TimedOut)
            }
            _ => {
                thread::sleep(flight.deliver_at.saturating_duration_since(now));
                Ok(Self::deliver(flight, buf))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order() {
        let (mut a, mut b) = pair(LinkConfig::default());
        a.send(&[1]).unwrap();
        a.send(&[2, 2]).unwrap();
        let mut buf = [0; 8];
        assert_eq!(b.recv(&mut buf, None).unwrap(), Recv::Datagram(1));
        assert_eq!(buf[0], 1);
        assert_eq!(b.recv(&mut buf, None).unwrap(), Recv::Datagram(2));
        assert_eq!(&buf[..2], &[2, 2]);
    }

    #[test]
    fn delay_holds_datagram_back() {
        let (mut a, mut b) = pair(LinkConfig {
            delay: Duration::from_millis(50),
        });
        let mut buf = [0; 8];
        a.send(&[7]).unwrap();
        let recv = b.recv(&mut buf, Some(Duration::from_millis(5))).unwrap();
        assert_eq!(recv, Recv::TimedOut);
        let recv = b.recv(&mut buf, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(recv, Recv::Datagram(1));
        assert_eq!(buf[0], 7);
    }

    #[test]
    fn drop_closes_after_drain() {
        let (mut a, mut b) = pair(LinkConfig::default());
        a.send(&[1]).unwrap();
        drop(a);
        let mut buf = [0; 8];
        assert_eq!(b.recv(&mut buf, None).unwrap(), Recv::Datagram(1));
        assert_eq!(b.recv(&mut buf, None).unwrap(), Recv::Datagram(0));
        // sending into a closed link is a silent loss
        b.send(&[1]).unwrap();
    }

    #[test]
    fn truncates_long_datagram() {
        let (mut a, mut b) = pair(LinkConfig::default());
        a.send(&[1, 2, 3, 4]).unwrap();
        let mut buf = [0; 2];
        assert_eq!(b.recv(&mut buf, None).unwrap(), Recv::Datagram(2));
        assert_eq!(buf, [1, 2]);
    }

    #[test]
    fn tap_records_sent() {
        let (mut a, _b) = pair(LinkConfig::default());
        let log = a.tap();
        a.send(&[1]).unwrap();
        a.send(&[2]).unwrap();
        assert_eq!(log.datagrams(), vec![vec![1], vec![2]]);
    }
}
