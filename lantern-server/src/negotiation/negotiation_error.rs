use crate::negotiation::GatheringOutcome;
use crate::transport::EngineError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Engine call that failed mid-negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    RemoteDescription,
    CreateAnswer,
    LocalDescription,
    /// The connection closed or failed while the answer was being prepared.
    HandOff,
}

impl fmt::Display for NegotiationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationStep::RemoteDescription => "set remote description",
            NegotiationStep::CreateAnswer => "create answer",
            NegotiationStep::LocalDescription => "set local description",
            NegotiationStep::HandOff => "hand off session",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("transport engine could not be provisioned: {0}")]
    EngineConfiguration(#[source] EngineError),

    #[error("failed to {step}: {source}")]
    NegotiationStep {
        step: NegotiationStep,
        #[source]
        source: EngineError,
    },

    #[error("no server reflexive candidate after {:.3}s ({outcome:?})", .elapsed.as_secs_f64())]
    PathValidation {
        outcome: GatheringOutcome,
        elapsed: Duration,
    },
}

impl NegotiationError {
    /// Stable identifier used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NegotiationError::MalformedInput(_) => "malformed_input",
            NegotiationError::EngineConfiguration(_) => "engine_configuration",
            NegotiationError::NegotiationStep { .. } => "negotiation_step_failure",
            NegotiationError::PathValidation { .. } => "path_validation_failure",
        }
    }

    /// Failures caused by what the client sent or by provisioning, as opposed
    /// to failures in the middle of an exchange.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            NegotiationError::MalformedInput(_) | NegotiationError::EngineConfiguration(_)
        )
    }
}
