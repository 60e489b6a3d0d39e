use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::counterexample::Counterexample;
use crate::parser::ProtocolError;

/// Outcome of one search-oracle invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Sat,
    Unsat,
    /// The invocation was stopped through its cancellation token before it
    /// reported a verdict.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    /// Full transcript; the only channel that carries the assignment.
    pub transcript: String,
}

impl SearchOutcome {
    pub fn sat(transcript: impl Into<String>) -> Self {
        Self {
            status: SearchStatus::Sat,
            transcript: transcript.into(),
        }
    }

    pub fn unsat(transcript: impl Into<String>) -> Self {
        Self {
            status: SearchStatus::Unsat,
            transcript: transcript.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: SearchStatus::Cancelled,
            transcript: String::new(),
        }
    }
}

/// Outcome of one equivalence check.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// `None` when the candidate is equivalent for the requested bit width.
    pub counterexample: Option<Counterexample>,
    pub transcript: String,
}

/// Which CEGIS iteration and placement an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationLabel {
    pub iteration: usize,
    pub placement: Option<usize>,
}

impl InvocationLabel {
    pub fn single(iteration: usize) -> Self {
        Self {
            iteration,
            placement: None,
        }
    }

    pub fn placement(iteration: usize, placement: usize) -> Self {
        Self {
            iteration,
            placement: Some(placement),
        }
    }
}

impl fmt::Display for InvocationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.placement {
            Some(p) => write!(f, "iteration {}, placement {p}", self.iteration),
            None => write!(f, "iteration {}", self.iteration),
        }
    }
}

/// Everything an oracle needs for one invocation. The encoded problem has
/// already been written to `problem_path`, an artifact owned by this
/// invocation alone.
#[derive(Debug, Clone, Copy)]
pub struct OracleInvocation<'a> {
    pub label: InvocationLabel,
    pub problem: &'a str,
    pub problem_path: &'a Path,
    pub cancel: &'a CancellationToken,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while driving `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to signal process group of `{program}`: {source}")]
    Signal {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exceeded its wall-clock limit of {limit:?}")]
    TimedOut { program: String, limit: Duration },
    #[error("`{program}` exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("artifact I/O failed for {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("oracle protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
}

impl OracleError {
    /// Launch, I/O and signalling failures: the environment, not the oracle's
    /// answer, is at fault.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Self::Launch { .. } | Self::Io { .. } | Self::Signal { .. } | Self::Artifact { .. }
        )
    }
}

/// Combinatorial search over hole values.
pub trait SearchOracle: Send + Sync {
    /// Solve one encoded problem. Implementations must stop promptly and
    /// reclaim everything they launched once `invocation.cancel` fires.
    fn search(&self, invocation: &OracleInvocation<'_>) -> Result<SearchOutcome, OracleError>;
}

/// Formal equivalence between a fixed candidate and the reference program.
pub trait EquivalenceOracle: Send + Sync {
    fn check(
        &self,
        invocation: &OracleInvocation<'_>,
        input_bit_width: u32,
    ) -> Result<CheckOutcome, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedSearch {
        status: SearchStatus,
        calls: AtomicUsize,
    }

    impl SearchOracle for ScriptedSearch {
        fn search(&self, invocation: &OracleInvocation<'_>) -> Result<SearchOutcome, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if invocation.cancel.is_cancelled() {
                return Ok(SearchOutcome::cancelled());
            }
            Ok(SearchOutcome {
                status: self.status,
                transcript: invocation.problem.to_string(),
            })
        }
    }

    #[test]
    fn label_display_includes_placement_only_when_present() {
        assert_eq!(InvocationLabel::single(3).to_string(), "iteration 3");
        assert_eq!(
            InvocationLabel::placement(1, 2).to_string(),
            "iteration 1, placement 2"
        );
    }

    #[test]
    fn oracle_observes_cancellation_token() {
        let oracle = ScriptedSearch {
            status: SearchStatus::Sat,
            calls: AtomicUsize::new(0),
        };
        let cancel = CancellationToken::new();
        let invocation = OracleInvocation {
            label: InvocationLabel::single(0),
            problem: "problem",
            problem_path: Path::new("/nonexistent/problem.sk"),
            cancel: &cancel,
        };
        assert_eq!(oracle.search(&invocation).unwrap().status, SearchStatus::Sat);
        cancel.cancel();
        assert_eq!(
            oracle.search(&invocation).unwrap().status,
            SearchStatus::Cancelled
        );
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn resource_errors_are_classified() {
        let launch = OracleError::Launch {
            program: "sketch".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let protocol = OracleError::from(ProtocolError::MissingBinding { hole: "h".into() });
        assert!(launch.is_resource_error());
        assert!(!protocol.is_resource_error());
    }
}
