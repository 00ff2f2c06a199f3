pub mod receiver;
pub mod sender;

use std::time::Duration;

use thiserror::Error;

pub use receiver::{Receiver, ReceiverBuilder};
pub use sender::{AdaptiveTimeout, RetransmissionPolicy, Sender, SenderBuilder};

pub const DEFAULT_MAX_PACKET: usize = 1300;

/// Configuration shared by both ends of a transfer.
pub struct Builder {
    pub max_packet: usize,
    pub policy: RetransmissionPolicy,
    pub max_retransmissions: Option<u32>,
    pub idle_timeout: Option<Duration>,
}

impl Builder {
    pub fn build(self) -> Result<(Sender, Receiver), BuildError> {
        let sender = SenderBuilder {
            max_packet: self.max_packet,
            policy: self.policy,
            max_retransmissions: self.max_retransmissions,
        }
        .build()?;
        let receiver = ReceiverBuilder {
            max_packet: self.max_packet,
            idle_timeout: self.idle_timeout,
        }
        .build()?;
        Ok((sender, receiver))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            max_packet: DEFAULT_MAX_PACKET,
            policy: RetransmissionPolicy::default(),
            max_retransmissions: None,
            idle_timeout: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("max packet size {0} leaves no room for a body")]
    MaxPacketTooSmall(usize),
    #[error("rtt history must hold at least one sample")]
    EmptyHistory,
    #[error("ewma weight {0} is outside (0, 1]")]
    InvalidWeight(f64),
    #[error("timeout penalty {0} is below 1")]
    InvalidPenalty(f64),
    #[error("invalid timeout range")]
    InvalidTimeoutRange,
}
