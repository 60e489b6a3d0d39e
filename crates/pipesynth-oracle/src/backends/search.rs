use std::ffi::OsString;
use std::time::Duration;

use tracing::{debug, warn};

use crate::oracle::{OracleError, OracleInvocation, SearchOracle, SearchOutcome};
use crate::process::{self, Completion, OracleCommand};

/// Search oracle that shells out to a solver binary.
///
/// The problem file path is appended to the command line. Exit status 0 means
/// SAT; any other status means UNSAT. The solver's stdout is the transcript.
#[derive(Debug, Clone)]
pub struct ProcessSearchOracle {
    command: OracleCommand,
    timeout: Option<Duration>,
}

impl ProcessSearchOracle {
    pub fn new(command: OracleCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    /// `sketch -V 3 --bnd-inbits=2 --slv-seed=1 [--slv-parallel]`.
    pub fn sketch(parallel: bool) -> Self {
        let mut command = OracleCommand::new("sketch").args([
            "-V",
            "3",
            "--bnd-inbits=2",
            "--slv-seed=1",
        ]);
        if parallel {
            command = command.arg("--slv-parallel");
        }
        Self::new(command)
    }

    /// Wall-clock limit per invocation; an invocation that exceeds it is
    /// reported as UNSAT. `0` disables the limit.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        self
    }

    pub fn command(&self) -> &OracleCommand {
        &self.command
    }
}

impl SearchOracle for ProcessSearchOracle {
    fn search(&self, invocation: &OracleInvocation<'_>) -> Result<SearchOutcome, OracleError> {
        let args = [OsString::from(invocation.problem_path)];
        debug!(label = %invocation.label, command = %self.command, "running search oracle");
        match process::run(&self.command, &args, None, invocation.cancel, self.timeout)? {
            Completion::Exited(output) if output.success => Ok(SearchOutcome::sat(output.stdout)),
            Completion::Exited(output) => {
                debug!(label = %invocation.label, code = ?output.code, "search oracle reported UNSAT");
                Ok(SearchOutcome::unsat(output.stdout))
            }
            Completion::TimedOut => {
                warn!(label = %invocation.label, "search oracle timed out; treating as UNSAT");
                Ok(SearchOutcome::unsat(String::new()))
            }
            Completion::Cancelled => Ok(SearchOutcome::cancelled()),
        }
    }
}
