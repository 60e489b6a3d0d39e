//! Outcomes and per-round reporting.

use std::fmt;
use std::time::Duration;

use pipesynth_oracle::{Counterexample, HoleAssignment};
use serde::Serialize;

use crate::constraints::ConstraintSet;

/// Terminal result of a search or of the whole refinement loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "assignment", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    Success(HoleAssignment),
    /// No configuration satisfies the accumulated constraints.
    Failure,
}

impl SynthesisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SynthesisOutcome::Success(_))
    }

    pub fn assignment(&self) -> Option<&HoleAssignment> {
        match self {
            SynthesisOutcome::Success(assignment) => Some(assignment),
            SynthesisOutcome::Failure => None,
        }
    }
}

/// What happened to one placement candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Sat,
    Unsat,
    Cancelled,
    /// Invocation failed; only recorded once the search outcome was already
    /// decided by another candidate.
    Failed,
    /// Never launched because the outcome was decided first.
    NotLaunched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementSearchReport {
    pub outcome: SynthesisOutcome,
    /// Index of the candidate whose assignment was accepted.
    pub winner: Option<usize>,
    /// Indexed by placement candidate.
    pub candidates: Vec<CandidateStatus>,
}

impl PlacementSearchReport {
    /// Candidates abandoned because another one won: cancelled mid-flight or
    /// never launched.
    pub fn cancelled(&self) -> Vec<usize> {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, status)| {
                matches!(status, CandidateStatus::Cancelled | CandidateStatus::NotLaunched)
            })
            .map(|(index, _)| index)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "counterexample", rename_all = "snake_case")]
pub enum RoundVerdict {
    /// The search found nothing; the loop stops here.
    Unsat,
    Verified,
    Counterexample(Counterexample),
}

/// One SEARCH / VERIFY / REFINE round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub iteration: usize,
    /// Size of the constraint set the search ran against.
    pub constraints: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementSearchReport>,
    pub verdict: RoundVerdict,
}

#[derive(Debug, Clone, Serialize)]
pub struct CegisReport {
    pub run_id: String,
    pub outcome: SynthesisOutcome,
    pub rounds: Vec<RoundSummary>,
    /// Constraint set after the last refinement.
    pub constraints: ConstraintSet,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl CegisReport {
    pub fn iterations(&self) -> usize {
        self.rounds.len()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

impl fmt::Display for CegisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            SynthesisOutcome::Success(assignment) => {
                writeln!(
                    f,
                    "VERIFIED after {} iteration(s) in {:.2}s",
                    self.iterations(),
                    self.elapsed.as_secs_f64()
                )?;
                for (hole, value) in assignment.iter() {
                    writeln!(f, "  {hole} = {value}")?;
                }
            }
            SynthesisOutcome::Failure => {
                writeln!(
                    f,
                    "SYNTHESIS FAILED after {} iteration(s) in {:.2}s: \
                     no configuration satisfies the accumulated constraints",
                    self.iterations(),
                    self.elapsed.as_secs_f64()
                )?;
            }
        }
        for round in &self.rounds {
            write!(
                f,
                "  round {}: {} constraint(s)",
                round.iteration, round.constraints
            )?;
            if let Some(search) = &round.placement {
                match search.winner {
                    Some(winner) => write!(
                        f,
                        ", placement {winner} won, {} cancelled",
                        search.cancelled().len()
                    )?,
                    None => write!(f, ", all {} placements unsat", search.candidates.len())?,
                }
            }
            match &round.verdict {
                RoundVerdict::Unsat => writeln!(f, ", unsat")?,
                RoundVerdict::Verified => writeln!(f, ", verified")?,
                RoundVerdict::Counterexample(cex) => writeln!(f, ", counterexample {cex}")?,
            }
        }
        Ok(())
    }
}
