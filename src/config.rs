//! JSON configuration for the binaries.
//!
//! Every field is optional; missing ones take the library defaults.
//!
//! ```json
//! {
//!     "max_packet": 1300,
//!     "policy": { "kind": "adaptive", "initial_ms": 50, "ack_weight": 0.3 },
//!     "max_retransmissions": null,
//!     "idle_timeout_ms": null
//! }
//! ```

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layer::{
    sender::{
        AdaptiveTimeout, DEFAULT_ACK_WEIGHT, DEFAULT_HISTORY_LEN, DEFAULT_INITIAL_RTO,
        DEFAULT_MAX_RTO, DEFAULT_MIN_RTO, DEFAULT_TIMEOUT_PENALTY, DEFAULT_TIMEOUT_WEIGHT,
    },
    BuildError, Builder, Receiver, RetransmissionPolicy, Sender, DEFAULT_MAX_PACKET,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub max_packet: Option<usize>,
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
    #[serde(default)]
    pub max_retransmissions: Option<u32>,
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    Adaptive {
        #[serde(default)]
        initial_ms: Option<u64>,
        #[serde(default)]
        min_ms: Option<u64>,
        #[serde(default)]
        max_ms: Option<u64>,
        #[serde(default)]
        ack_weight: Option<f64>,
        #[serde(default)]
        timeout_weight: Option<f64>,
        #[serde(default)]
        penalty: Option<f64>,
        #[serde(default)]
        history_len: Option<usize>,
        #[serde(default)]
        karn: Option<bool>,
    },
    FixedInterval {
        timeout_ms: u64,
        #[serde(default)]
        pacing_ms: Option<u64>,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Build(#[from] BuildError),
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }

    #[must_use]
    pub fn policy(&self) -> RetransmissionPolicy {
        match &self.policy {
            None => RetransmissionPolicy::default(),
            Some(PolicyConfig::Adaptive {
                initial_ms,
                min_ms,
                max_ms,
                ack_weight,
                timeout_weight,
                penalty,
                history_len,
                karn,
            }) => RetransmissionPolicy::Adaptive(AdaptiveTimeout {
                initial: initial_ms.map_or(DEFAULT_INITIAL_RTO, Duration::from_millis),
                min: min_ms.map_or(DEFAULT_MIN_RTO, Duration::from_millis),
                max: max_ms.map_or(DEFAULT_MAX_RTO, Duration::from_millis),
                ack_weight: ack_weight.unwrap_or(DEFAULT_ACK_WEIGHT),
                timeout_weight: timeout_weight.unwrap_or(DEFAULT_TIMEOUT_WEIGHT),
                penalty: penalty.unwrap_or(DEFAULT_TIMEOUT_PENALTY),
                history_len: history_len.unwrap_or(DEFAULT_HISTORY_LEN),
                karn: karn.unwrap_or(false),
            }),
            Some(PolicyConfig::FixedInterval {
                timeout_ms,
                pacing_ms,
            }) => RetransmissionPolicy::FixedInterval {
                timeout: Duration::from_millis(*timeout_ms),
                pacing: pacing_ms.map(Duration::from_millis),
            },
        }
    }

    #[must_use]
    pub fn builder(&self) -> Builder {
        Builder {
            max_packet: self.max_packet.unwrap_or(DEFAULT_MAX_PACKET),
            policy: self.policy(),
            max_retransmissions: self.max_retransmissions,
            idle_timeout: self.idle_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn build(&self) -> Result<(Sender, Receiver), Error> {
        Ok(self.builder().build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        let (sender, receiver) = config.build().unwrap();
        assert_eq!(sender.max_packet(), DEFAULT_MAX_PACKET);
        assert_eq!(receiver.max_packet(), DEFAULT_MAX_PACKET);
        assert_eq!(sender.policy(), &RetransmissionPolicy::default());
    }

    #[test]
    fn adaptive_partial() {
        let raw = r#"
{
    "max_packet": 8,
    "policy": { "kind": "adaptive", "initial_ms": 200, "ack_weight": 0.5 }
}
        "#;
        let config = Config::from_json(raw).unwrap();
        let policy = config.policy();
        let RetransmissionPolicy::Adaptive(adaptive) = policy else {
            panic!("expected adaptive policy");
        };
        assert_eq!(adaptive.initial, Duration::from_millis(200));
        assert_eq!(adaptive.ack_weight, 0.5);
        assert_eq!(adaptive.timeout_weight, DEFAULT_TIMEOUT_WEIGHT);
        assert_eq!(adaptive.history_len, DEFAULT_HISTORY_LEN);
        assert_eq!(adaptive.penalty, DEFAULT_TIMEOUT_PENALTY);
        assert!(!adaptive.karn);
        assert_eq!(config.builder().max_packet, 8);
    }

    #[test]
    fn adaptive_karn_and_penalty() {
        let raw = r#"{ "policy": { "kind": "adaptive", "penalty": 2.0, "karn": true } }"#;
        let RetransmissionPolicy::Adaptive(adaptive) = Config::from_json(raw).unwrap().policy()
        else {
            panic!("expected adaptive policy");
        };
        assert_eq!(adaptive.penalty, 2.0);
        assert!(adaptive.karn);
    }

    #[test]
    fn fixed_interval() {
        let raw = r#"
{
    "policy": { "kind": "fixed_interval", "timeout_ms": 100, "pacing_ms": 5 },
    "max_retransmissions": 10,
    "idle_timeout_ms": 1000
}
        "#;
        let config = Config::from_json(raw).unwrap();
        assert_eq!(
            config.policy(),
            RetransmissionPolicy::FixedInterval {
                timeout: Duration::from_millis(100),
                pacing: Some(Duration::from_millis(5)),
            }
        );
        let builder = config.builder();
        assert_eq!(builder.max_retransmissions, Some(10));
        assert_eq!(builder.idle_timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn serialize_round_trip() {
        let config = Config {
            max_packet: Some(512),
            policy: Some(PolicyConfig::FixedInterval {
                timeout_ms: 30,
                pacing_ms: None,
            }),
            max_retransmissions: None,
            idle_timeout_ms: Some(5),
        };
        let raw = serde_json::to_string(&config).unwrap();
        assert_eq!(Config::from_json(&raw).unwrap(), config);
    }

    #[test]
    fn invalid_values_rejected() {
        let config = Config::from_json(r#"{ "max_packet": 2 }"#).unwrap();
        assert!(matches!(
            config.build(),
            Err(Error::Build(BuildError::MaxPacketTooSmall(2)))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "policy": { "kind": "sliding" } }"#),
            Err(Error::Parse(_))
        ));
    }
}
