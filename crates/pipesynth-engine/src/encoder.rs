//! Rendering a configuration plus constraints into the search oracle's
//! input language.
//!
//! The textual encoding itself is an external concern; this module only
//! defines the contract and a process-backed implementation that delegates
//! to a generator program over JSON.

use pipesynth_oracle::process::{self, Completion, OracleCommand};
use pipesynth_oracle::{CancellationToken, Hole, HoleAssignment, OracleError};
use serde::Serialize;
use thiserror::Error;

use crate::config::{Configuration, ResolvedIo};
use crate::constraints::ConstraintSet;

#[derive(Debug, Clone, Copy)]
pub enum EncodeMode<'a> {
    /// Search for an assignment satisfying structural and accumulated
    /// constraints.
    Codegen,
    /// Fix a complete assignment and ask whether it is universally correct.
    Verify(&'a HoleAssignment),
}

impl EncodeMode<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            EncodeMode::Codegen => "codegen",
            EncodeMode::Verify(_) => "verify",
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("verify-mode encoding needs values for holes: {}", missing.join(", "))]
    IncompleteAssignment { missing: Vec<String> },
    #[error("encoder process failed: {0}")]
    Process(#[from] OracleError),
    #[error("encoder produced invalid output: {0}")]
    InvalidOutput(String),
    #[error("encoding cancelled")]
    Cancelled,
    #[error("encoder failed: {0}")]
    Other(String),
}

pub trait Encoder: Send + Sync {
    /// Every hole the encoding of `config` declares.
    fn holes(&self, config: &Configuration) -> Result<Vec<Hole>, EncodeError>;

    /// Render one problem. In [`EncodeMode::Verify`] the caller has already
    /// checked the assignment with [`require_complete`]. Implementations that
    /// do real work should give up with [`EncodeError::Cancelled`] once
    /// `cancel` fires.
    fn encode(
        &self,
        config: &Configuration,
        mode: EncodeMode<'_>,
        constraints: &ConstraintSet,
        cancel: &CancellationToken,
    ) -> Result<String, EncodeError>;
}

/// Fail with [`EncodeError::IncompleteAssignment`] unless `assignment` covers
/// every hole.
pub fn require_complete(holes: &[Hole], assignment: &HoleAssignment) -> Result<(), EncodeError> {
    let missing = assignment.missing(holes);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EncodeError::IncompleteAssignment {
            missing: missing.into_iter().map(str::to_string).collect(),
        })
    }
}

#[derive(Serialize)]
struct EncoderRequest<'a> {
    request: &'static str,
    config: &'a Configuration,
    io: ResolvedIo,
    constant_index_bit_width: u32,
    constraints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignment: Option<&'a HoleAssignment>,
}

/// Encoder backed by an external generator program.
///
/// The generator reads one JSON request on stdin. For `"request": "holes"`
/// it prints a JSON array of `{"name", "bit_width"}` objects; for `"codegen"`
/// and `"verify"` it prints the encoded problem text.
#[derive(Debug, Clone)]
pub struct ProcessEncoder {
    command: OracleCommand,
}

impl ProcessEncoder {
    pub fn new(command: OracleCommand) -> Self {
        Self { command }
    }

    fn call(
        &self,
        request: &EncoderRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, EncodeError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| EncodeError::Other(e.to_string()))?;
        match process::run(&self.command, &[], Some(payload), cancel, None)? {
            Completion::Exited(output) if output.success => Ok(output.stdout),
            Completion::Exited(output) => Err(EncodeError::Process(OracleError::Failed {
                program: self.command.program().to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })),
            Completion::Cancelled => Err(EncodeError::Cancelled),
            Completion::TimedOut => Err(EncodeError::Other(format!(
                "`{}` did not finish",
                self.command
            ))),
        }
    }

    fn request<'a>(
        config: &'a Configuration,
        request: &'static str,
        constraints: &ConstraintSet,
        assignment: Option<&'a HoleAssignment>,
    ) -> EncoderRequest<'a> {
        EncoderRequest {
            request,
            config,
            io: config.resolved_io(),
            constant_index_bit_width: config.constant_index_bit_width(),
            constraints: constraints.predicates(),
            assignment,
        }
    }
}

impl Encoder for ProcessEncoder {
    fn holes(&self, config: &Configuration) -> Result<Vec<Hole>, EncodeError> {
        let request = Self::request(config, "holes", &ConstraintSet::new(), None);
        let out = self.call(&request, &CancellationToken::new())?;
        serde_json::from_str(&out).map_err(|e| EncodeError::InvalidOutput(e.to_string()))
    }

    fn encode(
        &self,
        config: &Configuration,
        mode: EncodeMode<'_>,
        constraints: &ConstraintSet,
        cancel: &CancellationToken,
    ) -> Result<String, EncodeError> {
        let assignment = match mode {
            EncodeMode::Codegen => None,
            EncodeMode::Verify(assignment) => Some(assignment),
        };
        self.call(
            &Self::request(config, mode.name(), constraints, assignment),
            cancel,
        )
    }
}
