use std::ffi::OsString;
use std::time::Duration;

use tracing::debug;

use crate::counterexample::parse_counterexample;
use crate::oracle::{CheckOutcome, EquivalenceOracle, OracleError, OracleInvocation};
use crate::process::{self, Completion, OracleCommand};

/// Equivalence oracle that shells out to a checker binary.
///
/// Invoked as `<command> --input-bits <N> <problem file>`. A zero exit status
/// with a transcript in the counterexample grammar is the only accepted
/// answer; a nonzero status or a timeout is an error, never a verdict.
#[derive(Debug, Clone)]
pub struct ProcessEquivalenceOracle {
    command: OracleCommand,
    timeout: Option<Duration>,
}

impl ProcessEquivalenceOracle {
    pub fn new(command: OracleCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        self
    }

    pub fn command(&self) -> &OracleCommand {
        &self.command
    }
}

impl EquivalenceOracle for ProcessEquivalenceOracle {
    fn check(
        &self,
        invocation: &OracleInvocation<'_>,
        input_bit_width: u32,
    ) -> Result<CheckOutcome, OracleError> {
        let args = [
            OsString::from("--input-bits"),
            OsString::from(input_bit_width.to_string()),
            OsString::from(invocation.problem_path),
        ];
        debug!(label = %invocation.label, input_bit_width, "running equivalence oracle");
        let program = self.command.program().to_string();
        match process::run(&self.command, &args, None, invocation.cancel, self.timeout)? {
            Completion::Exited(output) if output.success => Ok(CheckOutcome {
                counterexample: parse_counterexample(&output.stdout)?,
                transcript: output.stdout,
            }),
            Completion::Exited(output) => Err(OracleError::Failed {
                program,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            }),
            Completion::TimedOut => Err(OracleError::TimedOut {
                program,
                limit: self.timeout.unwrap_or_default(),
            }),
            Completion::Cancelled => Err(OracleError::Io {
                program,
                source: std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "equivalence check cancelled",
                ),
            }),
        }
    }
}
