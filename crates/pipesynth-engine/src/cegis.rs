//! Counterexample-guided refinement loop.
//!
//! Each iteration runs SEARCH against the accumulated constraints, VERIFYs
//! the resulting assignment and, on a counterexample, REFINEs the constraint
//! set before the next iteration. Iterations never overlap. The loop stops
//! when verification succeeds, when SEARCH reports UNSAT, or when an
//! iteration budget or deadline set in [`CegisOptions`] runs out. The
//! deadline also cancels whichever oracle call is in flight when it passes.
//! Without a budget the loop terminates only because every refinement
//! removes the rejected assignment from a finite hole space.

use std::time::Instant;

use pipesynth_oracle::{
    CancellationToken, Counterexample, EquivalenceOracle, Hole, HoleAssignment, InvocationLabel,
    OracleInvocation, SearchOracle,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::config::Configuration;
use crate::constraints::ConstraintSet;
use crate::encoder::{require_complete, EncodeMode, Encoder};
use crate::error::SynthesisError;
use crate::refine::{refine, RefinementStrategy};
use crate::result::{CegisReport, RoundSummary, RoundVerdict, SynthesisOutcome};
use crate::search::{placement_search, single_shot_search, SearchContext};
use crate::timeout::Deadline;

/// Default bit width of the inputs the equivalence oracle explores.
pub const DEFAULT_VERIFY_INPUT_BITS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// One search over the whole hole space.
    SingleShot,
    /// Race every placement candidate.
    Placement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CegisOptions {
    /// `None` picks [`SearchStrategy::SingleShot`] when the configuration
    /// leaves allocation to the search oracle and
    /// [`SearchStrategy::Placement`] otherwise.
    pub strategy: Option<SearchStrategy>,
    /// Concurrent placement workers; `None` runs every candidate at once.
    pub max_workers: Option<usize>,
    pub verify_input_bits: u32,
    /// Iterations allowed before giving up; `None` is unbounded.
    pub max_iterations: Option<usize>,
    /// Wall-clock limit for the whole loop in seconds; 0 disables it. Oracle
    /// calls still running at the limit are cancelled.
    pub timeout_secs: u64,
    pub refinement: RefinementStrategy,
}

impl Default for CegisOptions {
    fn default() -> Self {
        Self {
            strategy: None,
            max_workers: None,
            verify_input_bits: DEFAULT_VERIFY_INPUT_BITS,
            max_iterations: None,
            timeout_secs: 0,
            refinement: RefinementStrategy::default(),
        }
    }
}

impl CegisOptions {
    pub fn strategy_for(&self, config: &Configuration) -> SearchStrategy {
        self.strategy.unwrap_or(if config.synthesized_allocation {
            SearchStrategy::SingleShot
        } else {
            SearchStrategy::Placement
        })
    }
}

pub struct CegisController<'a> {
    config: &'a Configuration,
    encoder: &'a dyn Encoder,
    search: &'a dyn SearchOracle,
    equivalence: &'a dyn EquivalenceOracle,
    artifacts: ArtifactStore,
    options: CegisOptions,
}

impl<'a> CegisController<'a> {
    pub fn new(
        config: &'a Configuration,
        encoder: &'a dyn Encoder,
        search: &'a dyn SearchOracle,
        equivalence: &'a dyn EquivalenceOracle,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            config,
            encoder,
            search,
            equivalence,
            artifacts,
            options: CegisOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CegisOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CegisOptions {
        &self.options
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run the loop from `base` until it reaches a terminal state.
    pub fn run(&self, base: ConstraintSet) -> Result<CegisReport, SynthesisError> {
        let started = Instant::now();
        let holes = self.prepare()?;
        let strategy = self.options.strategy_for(self.config);
        let deadline = Deadline::after_secs(self.options.timeout_secs);
        info!(
            run = self.artifacts.run_id(),
            holes = holes.len(),
            strategy = ?strategy,
            refinement = ?self.options.refinement,
            "Starting CEGIS loop..."
        );

        let ctx = SearchContext {
            config: self.config,
            holes: &holes,
            encoder: self.encoder,
            oracle: self.search,
            artifacts: &self.artifacts,
        };
        let mut constraints = base;
        let mut rounds = Vec::new();
        let mut iteration = 0;

        let outcome = loop {
            if let Some(budget) = self.options.max_iterations {
                if iteration >= budget {
                    return Err(SynthesisError::IterationBudgetExhausted { budget });
                }
            }
            let out_of_time = SynthesisError::DeadlineExceeded {
                iterations: iteration,
            };
            if deadline.passed() {
                return Err(out_of_time);
            }

            let cancel = CancellationToken::new();
            let watch = deadline.watch(&cancel);
            let searched = match strategy {
                SearchStrategy::SingleShot => {
                    single_shot_search(&ctx, &constraints, iteration, &cancel)
                        .map(|found| (found, None))
                }
                SearchStrategy::Placement => placement_search(
                    &ctx,
                    &constraints,
                    iteration,
                    self.options.max_workers,
                    &cancel,
                )
                .map(|report| (report.outcome.clone(), Some(report))),
            };
            let (found, placement) = match searched {
                Ok((SynthesisOutcome::Failure, _)) | Err(_) if watch.fired() => {
                    return Err(out_of_time)
                }
                result => result?,
            };
            drop(watch);
            let mut round = RoundSummary {
                iteration,
                constraints: constraints.len(),
                placement,
                verdict: RoundVerdict::Unsat,
            };

            let SynthesisOutcome::Success(assignment) = found else {
                info!(iteration, "Search is UNSAT; no configuration satisfies the constraints");
                rounds.push(round);
                break SynthesisOutcome::Failure;
            };

            let cancel = CancellationToken::new();
            let watch = deadline.watch(&cancel);
            let verdict = self.check(&holes, &assignment, iteration, &cancel);
            if watch.fired() {
                return Err(out_of_time);
            }
            drop(watch);
            match verdict? {
                None => {
                    info!(iteration, "Candidate verified");
                    round.verdict = RoundVerdict::Verified;
                    rounds.push(round);
                    break SynthesisOutcome::Success(assignment);
                }
                Some(cex) => {
                    info!(iteration, counterexample = %cex, "Candidate refuted");
                    let refined = refine(
                        self.options.refinement,
                        &constraints,
                        &assignment,
                        &cex,
                        iteration,
                    );
                    debug_assert!(refined.strictly_extends(&constraints));
                    constraints = refined;
                    round.verdict = RoundVerdict::Counterexample(cex);
                    rounds.push(round);
                }
            }
            iteration += 1;
        };

        let report = CegisReport {
            run_id: self.artifacts.run_id().to_string(),
            outcome,
            rounds,
            constraints,
            elapsed: started.elapsed(),
        };
        info!(
            iterations = report.iterations(),
            verified = report.outcome.is_success(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "CEGIS loop finished"
        );
        Ok(report)
    }

    /// Check one complete assignment outside the loop. Returns the
    /// counterexample, or `None` when the assignment is equivalent.
    pub fn verify(
        &self,
        assignment: &HoleAssignment,
        iteration: usize,
    ) -> Result<Option<Counterexample>, SynthesisError> {
        let holes = self.prepare()?;
        self.check(&holes, assignment, iteration, &CancellationToken::new())
    }

    fn prepare(&self) -> Result<Vec<Hole>, SynthesisError> {
        self.config.validate()?;
        let label = InvocationLabel::single(0);
        self.artifacts
            .ensure_dir()
            .map_err(|e| SynthesisError::from_oracle(label, e))?;
        self.encoder
            .holes(self.config)
            .map_err(|e| SynthesisError::encode(label, e))
    }

    /// VERIFY step. The problem depends only on the configuration and the
    /// assignment, so repeating it yields the same verdict.
    fn check(
        &self,
        holes: &[Hole],
        assignment: &HoleAssignment,
        iteration: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<Counterexample>, SynthesisError> {
        let label = InvocationLabel::single(iteration);
        require_complete(holes, assignment).map_err(|e| SynthesisError::encode(label, e))?;
        let problem = self
            .encoder
            .encode(
                self.config,
                EncodeMode::Verify(assignment),
                &ConstraintSet::new(),
                cancel,
            )
            .map_err(|e| SynthesisError::encode(label, e))?;
        let pair = self.artifacts.pair(ArtifactKind::Verify, label);
        pair.write_problem(&problem)
            .map_err(|e| SynthesisError::from_oracle(label, e))?;

        debug!(
            iteration,
            input_bits = self.options.verify_input_bits,
            "Verifying candidate..."
        );
        let invocation = OracleInvocation {
            label,
            problem: &problem,
            problem_path: &pair.problem,
            cancel,
        };
        let outcome = self
            .equivalence
            .check(&invocation, self.options.verify_input_bits)
            .map_err(|e| SynthesisError::from_oracle(label, e))?;
        pair.write_output(&outcome.transcript)
            .map_err(|e| SynthesisError::from_oracle(label, e))?;
        Ok(outcome.counterexample)
    }
}
