use crate::transport::TransportConfig;
use std::time::Duration;

/// Policy knobs for one negotiation and the session it hands off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationConfig {
    pub transport: TransportConfig,
    /// How often the local description is rescanned for a reflexive candidate.
    pub poll_interval: Duration,
    /// Upper bound on the gathering wait; expiry fails the negotiation.
    pub gather_timeout: Duration,
    /// Period of the status messages sent on every open data channel.
    pub heartbeat_interval: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            poll_interval: Duration::from_millis(25),
            gather_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_millis(10),
        }
    }
}
