use pipesynth_oracle::{InvocationLabel, OracleError, ProtocolError};
use thiserror::Error;

use crate::config::ConfigurationError;
use crate::encoder::EncodeError;

/// Fatal failures of a synthesis attempt. An UNSAT search is not an error:
/// it is reported as [`crate::SynthesisOutcome::Failure`].
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("encoding failed ({label}): {source}")]
    Encode {
        label: InvocationLabel,
        #[source]
        source: EncodeError,
    },
    #[error("oracle protocol violation ({label}): {source}")]
    Protocol {
        label: InvocationLabel,
        #[source]
        source: ProtocolError,
    },
    #[error("resource error ({label}): {source}")]
    Resource {
        label: InvocationLabel,
        #[source]
        source: OracleError,
    },
    #[error("oracle failed ({label}): {source}")]
    Oracle {
        label: InvocationLabel,
        #[source]
        source: OracleError,
    },
    #[error("search cancelled during iteration {iteration} before any verdict")]
    Cancelled { iteration: usize },
    #[error("placement search worker panicked during iteration {iteration}")]
    WorkerPanicked { iteration: usize },
    #[error("iteration budget of {budget} exhausted without a verified configuration")]
    IterationBudgetExhausted { budget: usize },
    #[error("synthesis deadline passed after {iterations} iteration(s)")]
    DeadlineExceeded { iterations: usize },
}

impl SynthesisError {
    pub(crate) fn from_oracle(label: InvocationLabel, err: OracleError) -> Self {
        match err {
            OracleError::Protocol(source) => Self::Protocol { label, source },
            source if source.is_resource_error() => Self::Resource { label, source },
            source => Self::Oracle { label, source },
        }
    }

    pub(crate) fn encode(label: InvocationLabel, err: EncodeError) -> Self {
        match err {
            EncodeError::Process(source) if source.is_resource_error() => {
                Self::Resource { label, source }
            }
            source => Self::Encode { label, source },
        }
    }

    /// Iteration and placement of the invocation that failed, for locating
    /// its artifacts.
    pub fn label(&self) -> Option<InvocationLabel> {
        match self {
            Self::Encode { label, .. }
            | Self::Protocol { label, .. }
            | Self::Resource { label, .. }
            | Self::Oracle { label, .. } => Some(*label),
            _ => None,
        }
    }
}
