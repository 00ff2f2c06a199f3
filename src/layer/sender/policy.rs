use std::time::Duration;

use tracing::trace;

use super::rtt::RttEstimator;
use crate::layer::BuildError;

pub const DEFAULT_INITIAL_RTO: Duration = Duration::from_millis(50);
pub const DEFAULT_MIN_RTO: Duration = Duration::from_millis(1);
pub const DEFAULT_MAX_RTO: Duration = Duration::from_secs(60);
pub const DEFAULT_ACK_WEIGHT: f64 = 0.3;
pub const DEFAULT_TIMEOUT_WEIGHT: f64 = 1.0;
pub const DEFAULT_TIMEOUT_PENALTY: f64 = 1.0;
pub const DEFAULT_HISTORY_LEN: usize = 5;

/// How long the sender waits for an ack before it retransmits.
#[derive(Debug, Clone, PartialEq)]
pub enum RetransmissionPolicy {
    /// Timeout follows the measured round trips.
    Adaptive(AdaptiveTimeout),
    /// One static timeout, optionally pausing between packets.
    FixedInterval {
        timeout: Duration,
        pacing: Option<Duration>,
    },
}

impl Default for RetransmissionPolicy {
    fn default() -> Self {
        RetransmissionPolicy::Adaptive(AdaptiveTimeout::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveTimeout {
    /// Timeout armed before the first sample exists.
    pub initial: Duration,
    pub min: Duration,
    pub max: Duration,
    /// EWMA weight applied after an ack.
    pub ack_weight: f64,
    /// EWMA weight applied after a timeout; heavier than `ack_weight`.
    pub timeout_weight: f64,
    /// A timed out wait is recorded as `elapsed * penalty`, capped at `max`.
    pub penalty: f64,
    pub history_len: usize,
    /// Skip the sample of an ack that arrives after a retransmission.
    pub karn: bool,
}

impl Default for AdaptiveTimeout {
    fn default() -> Self {
        AdaptiveTimeout {
            initial: DEFAULT_INITIAL_RTO,
            min: DEFAULT_MIN_RTO,
            max: DEFAULT_MAX_RTO,
            ack_weight: DEFAULT_ACK_WEIGHT,
            timeout_weight: DEFAULT_TIMEOUT_WEIGHT,
            penalty: DEFAULT_TIMEOUT_PENALTY,
            history_len: DEFAULT_HISTORY_LEN,
            karn: false,
        }
    }
}

impl RetransmissionPolicy {
    pub fn check(&self) -> Result<(), BuildError> {
        match self {
            RetransmissionPolicy::Adaptive(adaptive) => adaptive.check(),
            RetransmissionPolicy::FixedInterval { timeout, .. } => {
                if timeout.is_zero() {
                    return Err(BuildError::InvalidTimeoutRange);
                }
                Ok(())
            }
        }
    }

    /// Fresh timer state for one transfer.
    #[must_use]
    pub fn timer(&self) -> RetransmitTimer<'_> {
        let (rtt, rto) = match self {
            RetransmissionPolicy::Adaptive(adaptive) => (
                Some(RttEstimator::new(adaptive.history_len)),
                adaptive.initial.clamp(adaptive.min, adaptive.max),
            ),
            RetransmissionPolicy::FixedInterval { timeout, .. } => (None, *timeout),
        };
        RetransmitTimer {
            policy: self,
            rtt,
            rto,
        }
    }

    #[must_use]
    pub fn pacing(&self) -> Option<Duration> {
        match self {
            RetransmissionPolicy::Adaptive(_) => None,
            RetransmissionPolicy::FixedInterval { pacing, .. } => *pacing,
        }
    }
}

impl AdaptiveTimeout {
    pub fn check(&self) -> Result<(), BuildError> {
        if self.history_len == 0 {
            return Err(BuildError::EmptyHistory);
        }
        for weight in [self.ack_weight, self.timeout_weight] {
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(BuildError::InvalidWeight(weight));
            }
        }
        if !(self.penalty.is_finite() && self.penalty >= 1.0) {
            return Err(BuildError::InvalidPenalty(self.penalty));
        }
        if self.min.is_zero() || self.min > self.max {
            return Err(BuildError::InvalidTimeoutRange);
        }
        Ok(())
    }
}

/// Retransmission timeout state owned by a single `send` call.
#[derive(Debug)]
pub struct RetransmitTimer<'a> {
    policy: &'a RetransmissionPolicy,
    rtt: Option<RttEstimator>,
    rto: Duration,
}

impl RetransmitTimer<'_> {
    /// Current timeout to arm the next wait with.
    #[must_use]
    #[inline]
    pub fn rto(&self) -> Duration {
        self.rto
    }

    /// Records the round trip of an acked packet and returns whether the
    /// sample was taken.
    ///
    /// `retransmitted` tells the timer that the ack may answer an earlier copy.
    pub fn on_ack(&mut self, sample: Duration, retransmitted: bool) -> bool {
        if let (RetransmissionPolicy::Adaptive(adaptive), Some(rtt)) = (self.policy, &mut self.rtt)
        {
            if retransmitted && adaptive.karn {
                trace!(?sample, "ambiguous ack, no sample");
                return false;
            }
            rtt.push(sample);
            self.rto = next_rto(adaptive, rtt, adaptive.ack_weight);
            trace!(?sample, rto = ?self.rto, "rto after ack");
            return true;
        }
        false
    }

    /// Records a wait that ran out without a matching ack and returns whether
    /// the sample was taken.
    pub fn on_timeout(&mut self, elapsed: Duration) -> bool {
        if let (RetransmissionPolicy::Adaptive(adaptive), Some(rtt)) = (self.policy, &mut self.rtt)
        {
            let sample = Duration::try_from_secs_f64(elapsed.as_secs_f64() * adaptive.penalty)
                .map_or(adaptive.max, |sample| sample.min(adaptive.max));
            rtt.push(sample);
            self.rto = next_rto(adaptive, rtt, adaptive.timeout_weight);
            trace!(?sample, rto = ?self.rto, "rto after timeout");
            return true;
        }
        false
    }
}

fn next_rto(adaptive: &AdaptiveTimeout, rtt: &RttEstimator, weight: f64) -> Duration {
    match rtt.timeout(weight) {
        Some(rto) => rto.clamp(adaptive.min, adaptive.max),
        None => adaptive.initial.clamp(adaptive.min, adaptive.max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fixed_interval_never_moves() {
        let policy = RetransmissionPolicy::FixedInterval {
            timeout: ms(200),
            pacing: Some(ms(5)),
        };
        let mut timer = policy.timer();
        assert_eq!(timer.rto(), ms(200));
        assert!(!timer.on_ack(ms(10), false));
        assert!(!timer.on_timeout(ms(200)));
        assert_eq!(timer.rto(), ms(200));
        assert_eq!(policy.pacing(), Some(ms(5)));
    }

    #[test]
    fn adaptive_starts_at_initial() {
        let policy = RetransmissionPolicy::default();
        let timer = policy.timer();
        assert_eq!(timer.rto(), DEFAULT_INITIAL_RTO);
        assert_eq!(policy.pacing(), None);
    }

    #[test]
    fn first_ack_sets_rto_to_sample() {
        let policy = RetransmissionPolicy::default();
        let mut timer = policy.timer();
        assert!(timer.on_ack(ms(30), false));
        let diff = timer.rto().as_secs_f64() - 0.030;
        assert!(diff.abs() < 1e-6);
    }

    #[test]
    fn timeout_inflates_quickly() {
        let policy = RetransmissionPolicy::default();
        let mut timer = policy.timer();
        timer.on_ack(ms(20), false);
        timer.on_ack(ms(20), false);
        let before = timer.rto();
        assert!(timer.on_timeout(ms(100)));
        assert!(timer.rto() > before);
    }

    #[test]
    fn timeout_sample_is_raw_elapsed_by_default() {
        let policy = RetransmissionPolicy::default();
        let mut timer = policy.timer();
        timer.on_timeout(ms(40));
        let diff = timer.rto().as_secs_f64() - 0.040;
        assert!(diff.abs() < 1e-6);
    }

    #[test]
    fn retransmitted_ack_sampled_unless_karn() {
        let policy = RetransmissionPolicy::default();
        let mut timer = policy.timer();
        assert!(timer.on_ack(ms(30), true));

        let policy = RetransmissionPolicy::Adaptive(AdaptiveTimeout {
            karn: true,
            ..Default::default()
        });
        let mut timer = policy.timer();
        assert!(!timer.on_ack(ms(30), true));
        assert_eq!(timer.rto(), DEFAULT_INITIAL_RTO);
        assert!(timer.on_ack(ms(30), false));
    }

    #[test]
    fn clamped_to_range() {
        let policy = RetransmissionPolicy::Adaptive(AdaptiveTimeout {
            min: ms(5),
            max: ms(100),
            ..Default::default()
        });
        let mut timer = policy.timer();
        timer.on_ack(Duration::from_micros(10), false);
        assert_eq!(timer.rto(), ms(5));
        timer.on_timeout(ms(10_000));
        assert_eq!(timer.rto(), ms(100));
    }

    #[test]
    fn check_rejects_bad_values() {
        let bad = [
            AdaptiveTimeout {
                history_len: 0,
                ..Default::default()
            },
            AdaptiveTimeout {
                ack_weight: 0.0,
                ..Default::default()
            },
            AdaptiveTimeout {
                timeout_weight: 1.5,
                ..Default::default()
            },
            AdaptiveTimeout {
                penalty: 0.5,
                ..Default::default()
            },
            AdaptiveTimeout {
                min: ms(10),
                max: ms(1),
                ..Default::default()
            },
        ];
        for adaptive in bad {
            assert!(adaptive.check().is_err(), "{:?}", adaptive);
        }
        assert!(AdaptiveTimeout::default().check().is_ok());
        assert!(RetransmissionPolicy::FixedInterval {
            timeout: Duration::ZERO,
            pacing: None,
        }
        .check()
        .is_err());
    }

    #[test]
    fn huge_penalty_caps_at_max() {
        let policy = RetransmissionPolicy::Adaptive(AdaptiveTimeout {
            max: ms(100),
            penalty: 1e30,
            ..Default::default()
        });
        assert!(policy.check().is_ok());
        let mut timer = policy.timer();
        timer.on_timeout(ms(5));
        assert_eq!(timer.rto(), ms(100));
    }
}
