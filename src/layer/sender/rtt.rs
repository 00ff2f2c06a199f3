use std::{collections::VecDeque, time::Duration};

/// Smoothed values are rounded to this many decimal places of a second.
const ROUND_DECIMALS: i32 = 5;

/// Bounded history of round-trip samples owned by a single transfer.
///
/// Pushing into a full history clears it before the new sample lands, so the
/// estimate follows recent conditions instead of all-time ones.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    samples: VecDeque<Duration>,
    cap: usize,
}

impl RttEstimator {
    #[inline]
    fn check_rep(&self) {
        assert!(self.cap > 0);
        assert!(self.samples.len() <= self.cap);
    }

    #[must_use]
    pub fn new(cap: usize) -> Self {
        let this = RttEstimator {
            samples: VecDeque::with_capacity(cap),
            cap,
        };
        this.check_rep();
        this
    }

    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() >= self.cap {
            self.samples.clear();
        }
        self.samples.push_back(sample);
        self.check_rep();
    }

    /// Mean of the adjusted EWMA series over the history.
    ///
    /// `alpha` is the weight of the newest sample: `1.0` ignores the past at
    /// every step, smaller values react slower.
    #[must_use]
    pub fn timeout(&self, alpha: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        let decay = 1.0 - alpha;
        let mut num = 0.0;
        let mut den = 0.0;
        let mut sum = 0.0;
        for sample in &self.samples {
            num = sample.as_secs_f64() + decay * num;
            den = 1.0 + decay * den;
            sum += round(num / den);
        }
        let mean = sum / self.samples.len() as f64;
        Some(Duration::from_secs_f64(mean.max(0.0)))
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }
}

#[inline]
fn round(secs: f64) -> f64 {
    let scale = 10f64.powi(ROUND_DECIMALS);
    (secs * scale).round() / scale
}
