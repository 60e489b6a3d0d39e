//! One SEARCH step: a single oracle call, or a race over every placement
//! candidate.
//!
//! The race runs each candidate in its own worker with its own copy of the
//! constraint set and its own artifacts. The first candidate to come back SAT
//! with a well-formed assignment wins; every other worker is cancelled and
//! joined before the search returns, so no encoder or oracle process
//! outlives it. The search reports UNSAT only after every candidate has
//! reported UNSAT.
//!
//! Both entry points take the caller's cancellation token. Cancelling it from
//! outside, for example when the run's deadline passes, ends the step with
//! [`SynthesisError::Cancelled`] unless a verdict arrived first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use pipesynth_oracle::{
    parse_hole_assignment, CancellationToken, Hole, HoleAssignment, InvocationLabel,
    OracleInvocation, SearchOracle, SearchStatus,
};
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::config::Configuration;
use crate::constraints::ConstraintSet;
use crate::encoder::{EncodeError, EncodeMode, Encoder};
use crate::error::SynthesisError;
use crate::placement::{placements, Placement};
use crate::result::{CandidateStatus, PlacementSearchReport, SynthesisOutcome};

/// Everything a search step reads. Shared by reference across workers.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub config: &'a Configuration,
    pub holes: &'a [Hole],
    pub encoder: &'a dyn Encoder,
    pub oracle: &'a dyn SearchOracle,
    pub artifacts: &'a ArtifactStore,
}

enum Attempt {
    Sat(HoleAssignment),
    Unsat,
    Cancelled,
}

fn attempt(
    ctx: &SearchContext<'_>,
    constraints: &ConstraintSet,
    label: InvocationLabel,
    cancel: &CancellationToken,
) -> Result<Attempt, SynthesisError> {
    let problem = match ctx
        .encoder
        .encode(ctx.config, EncodeMode::Codegen, constraints, cancel)
    {
        Ok(problem) => problem,
        Err(EncodeError::Cancelled) => return Ok(Attempt::Cancelled),
        Err(e) => return Err(SynthesisError::encode(label, e)),
    };
    let pair = ctx.artifacts.pair(ArtifactKind::Codegen, label);
    pair.write_problem(&problem)
        .map_err(|e| SynthesisError::from_oracle(label, e))?;

    let invocation = OracleInvocation {
        label,
        problem: &problem,
        problem_path: &pair.problem,
        cancel,
    };
    let outcome = ctx
        .oracle
        .search(&invocation)
        .map_err(|e| SynthesisError::from_oracle(label, e))?;
    if outcome.status == SearchStatus::Cancelled {
        return Ok(Attempt::Cancelled);
    }
    pair.write_output(&outcome.transcript)
        .map_err(|e| SynthesisError::from_oracle(label, e))?;

    match outcome.status {
        SearchStatus::Sat => parse_hole_assignment(ctx.holes, &outcome.transcript)
            .map(Attempt::Sat)
            .map_err(|source| SynthesisError::Protocol { label, source }),
        SearchStatus::Unsat => Ok(Attempt::Unsat),
        SearchStatus::Cancelled => Ok(Attempt::Cancelled),
    }
}

/// Search once against `constraints` with no placement pinned.
pub fn single_shot_search(
    ctx: &SearchContext<'_>,
    constraints: &ConstraintSet,
    iteration: usize,
    cancel: &CancellationToken,
) -> Result<SynthesisOutcome, SynthesisError> {
    let label = InvocationLabel::single(iteration);
    info!(iteration, constraints = constraints.len(), "Searching...");
    match attempt(ctx, constraints, label, cancel)? {
        Attempt::Sat(assignment) => Ok(SynthesisOutcome::Success(assignment)),
        Attempt::Unsat => Ok(SynthesisOutcome::Failure),
        Attempt::Cancelled => Err(SynthesisError::Cancelled { iteration }),
    }
}

/// Race every placement candidate of `ctx.config` against `base`.
///
/// `max_workers` caps how many candidates run at once; `None` runs them all
/// concurrently. Results are consumed in completion order. The search
/// cancels `cancel` itself once a winner or a failure decides it, so pass a
/// token that belongs to this step alone.
pub fn placement_search(
    ctx: &SearchContext<'_>,
    base: &ConstraintSet,
    iteration: usize,
    max_workers: Option<usize>,
    cancel: &CancellationToken,
) -> Result<PlacementSearchReport, SynthesisError> {
    let candidates: Vec<Placement> = placements(ctx.config).collect();
    let total = candidates.len();
    let workers = max_workers.map_or(total, |cap| cap.clamp(1, total.max(1)));
    info!(
        iteration,
        candidates = total,
        workers,
        constraints = base.len(),
        "Starting placement search..."
    );

    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, Result<Attempt, SynthesisError>)>();

    let mut statuses = vec![CandidateStatus::NotLaunched; total];
    let mut winner: Option<(usize, HoleAssignment)> = None;
    let mut failure: Option<SynthesisError> = None;
    let mut panicked = false;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let tx = tx.clone();
                let (next, candidates) = (&next, &candidates);
                scope.spawn(move || loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(placement) = candidates.get(index) else {
                        break;
                    };
                    let label = InvocationLabel::placement(iteration, index);
                    debug!(%label, %placement, "Launching placement candidate");
                    let constraints = placement.constrain(ctx.config, base);
                    let result = attempt(ctx, &constraints, label, cancel);
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                })
            })
            .collect();
        drop(tx);

        for (index, result) in rx.iter() {
            let decided = winner.is_some() || failure.is_some();
            match result {
                Ok(Attempt::Sat(assignment)) => {
                    statuses[index] = CandidateStatus::Sat;
                    if !decided {
                        info!(iteration, placement = index, "Placement candidate is SAT");
                        winner = Some((index, assignment));
                        cancel.cancel();
                    }
                }
                Ok(Attempt::Unsat) => {
                    debug!(iteration, placement = index, "Placement candidate is UNSAT");
                    statuses[index] = CandidateStatus::Unsat;
                }
                Ok(Attempt::Cancelled) => statuses[index] = CandidateStatus::Cancelled,
                Err(e) if decided => {
                    warn!(iteration, placement = index, error = %e, "Ignoring failure of abandoned candidate");
                    statuses[index] = CandidateStatus::Failed;
                }
                Err(e) => {
                    statuses[index] = CandidateStatus::Failed;
                    failure = Some(e);
                    cancel.cancel();
                }
            }
        }

        for handle in handles {
            if handle.join().is_err() {
                panicked = true;
                cancel.cancel();
            }
        }
    });

    if let Some(e) = failure {
        return Err(e);
    }
    match winner {
        Some((index, assignment)) => {
            let report = PlacementSearchReport {
                outcome: SynthesisOutcome::Success(assignment),
                winner: Some(index),
                candidates: statuses,
            };
            info!(
                iteration,
                placement = index,
                cancelled = report.cancelled().len(),
                "Placement search finished"
            );
            Ok(report)
        }
        None if panicked => Err(SynthesisError::WorkerPanicked { iteration }),
        None if statuses.iter().any(|s| *s != CandidateStatus::Unsat) => {
            info!(
                iteration,
                cancelled = statuses.iter().filter(|s| **s != CandidateStatus::Unsat).count(),
                "Placement search cancelled before every candidate answered"
            );
            Err(SynthesisError::Cancelled { iteration })
        }
        None => {
            info!(iteration, candidates = total, "Every placement candidate is UNSAT");
            Ok(PlacementSearchReport {
                outcome: SynthesisOutcome::Failure,
                winner: None,
                candidates: statuses,
            })
        }
    }
}
