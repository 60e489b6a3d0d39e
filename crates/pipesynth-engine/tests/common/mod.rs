//! In-memory encoder and oracle stubs shared by the engine tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use pipesynth_engine::config::Configuration;
use pipesynth_engine::encoder::{EncodeError, EncodeMode, Encoder};
use pipesynth_engine::ConstraintSet;
use pipesynth_oracle::{
    CancellationToken, CheckOutcome, Counterexample, EquivalenceOracle, Hole, OracleError,
    OracleInvocation, SearchOracle, SearchOutcome,
};

pub fn config(stages: usize, state_groups: usize) -> Configuration {
    Configuration {
        name: "sample".to_string(),
        program: PathBuf::from("programs/sample.sk"),
        stateful_alu: PathBuf::from("alus/raw.alu"),
        stateless_alu: PathBuf::from("alus/stateless.alu"),
        num_pipeline_stages: stages,
        num_alus_per_stage: 2,
        num_fields_in_prog: 1,
        num_state_groups: state_groups,
        input_packet_fields: Vec::new(),
        output_packet_fields: Vec::new(),
        output_state_groups: Vec::new(),
        constant_set: vec![0, 1, 2, 3],
        synthesized_allocation: false,
        parallel_solver: false,
    }
}

/// Renders the mode on the first line followed by one predicate per line.
/// Every CODEGEN constraint set it sees is kept for inspection.
pub struct StubEncoder {
    holes: Vec<Hole>,
    pub codegen_calls: Mutex<Vec<ConstraintSet>>,
}

impl StubEncoder {
    pub fn new(holes: Vec<Hole>) -> Self {
        Self {
            holes,
            codegen_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<ConstraintSet> {
        self.codegen_calls.lock().unwrap().clone()
    }
}

impl Encoder for StubEncoder {
    fn holes(&self, _config: &Configuration) -> Result<Vec<Hole>, EncodeError> {
        Ok(self.holes.clone())
    }

    fn encode(
        &self,
        _config: &Configuration,
        mode: EncodeMode<'_>,
        constraints: &ConstraintSet,
        _cancel: &CancellationToken,
    ) -> Result<String, EncodeError> {
        match mode {
            EncodeMode::Codegen => {
                self.codegen_calls.lock().unwrap().push(constraints.clone());
                Ok(format!("codegen\n{}\n", constraints.predicates().join("\n")))
            }
            EncodeMode::Verify(assignment) => {
                Ok(format!("verify\n{}", assignment.to_holes_file()))
            }
        }
    }
}

/// Search oracle driven by a closure over the invocation.
pub struct FnSearch<F> {
    respond: F,
    calls: AtomicUsize,
}

impl<F> FnSearch<F>
where
    F: Fn(&OracleInvocation<'_>) -> SearchOutcome + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> SearchOracle for FnSearch<F>
where
    F: Fn(&OracleInvocation<'_>) -> SearchOutcome + Send + Sync,
{
    fn search(&self, invocation: &OracleInvocation<'_>) -> Result<SearchOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.respond)(invocation))
    }
}

/// Blocks until the invocation is cancelled, then reports it.
pub fn block_until_cancelled(invocation: &OracleInvocation<'_>) -> SearchOutcome {
    while !invocation.cancel.wait_timeout(Duration::from_secs(5)) {}
    SearchOutcome::cancelled()
}

/// Returns scripted verdicts in order, then "no counterexample" forever.
pub struct ScriptedEquivalence {
    verdicts: Mutex<VecDeque<Option<Counterexample>>>,
    calls: AtomicUsize,
    pub input_bits: Mutex<Vec<u32>>,
}

impl ScriptedEquivalence {
    pub fn new<I: IntoIterator<Item = Option<Counterexample>>>(verdicts: I) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().collect()),
            calls: AtomicUsize::new(0),
            input_bits: Mutex::new(Vec::new()),
        }
    }

    pub fn always_equivalent() -> Self {
        Self::new([])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EquivalenceOracle for ScriptedEquivalence {
    fn check(
        &self,
        _invocation: &OracleInvocation<'_>,
        input_bit_width: u32,
    ) -> Result<CheckOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.input_bits.lock().unwrap().push(input_bit_width);
        let counterexample = self.verdicts.lock().unwrap().pop_front().flatten();
        let transcript = match &counterexample {
            Some(cex) => cex.to_string(),
            None => "no counterexample".to_string(),
        };
        Ok(CheckOutcome {
            counterexample,
            transcript,
        })
    }
}

/// Equivalence oracle implemented as a predicate over the verify problem.
pub struct FnEquivalence<F>(pub F);

impl<F> EquivalenceOracle for FnEquivalence<F>
where
    F: Fn(&str) -> Option<Counterexample> + Send + Sync,
{
    fn check(
        &self,
        invocation: &OracleInvocation<'_>,
        _input_bit_width: u32,
    ) -> Result<CheckOutcome, OracleError> {
        Ok(CheckOutcome {
            counterexample: (self.0)(invocation.problem),
            transcript: String::new(),
        })
    }
}

pub fn pkt0_cex(value: i64) -> Counterexample {
    Counterexample::new()
        .with_packet("pkt_0", value)
        .with_state("state_0", 0)
}
