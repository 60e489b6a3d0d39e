#![doc = include_str!("../README.md")]

//! Oracle boundary for pipeline synthesis.
//!
//! The engine never talks to a solver binary directly: it hands encoded
//! problems to a [`oracle::SearchOracle`] or [`oracle::EquivalenceOracle`]
//! and reads assignments and counterexamples back through the parsers in
//! this crate.

pub mod backends;
pub mod cancel;
pub mod counterexample;
pub mod holes;
pub mod oracle;
pub mod parser;
pub mod process;

pub use cancel::CancellationToken;
pub use counterexample::Counterexample;
pub use holes::{Hole, HoleAssignment};
pub use oracle::{
    CheckOutcome, EquivalenceOracle, InvocationLabel, OracleError, OracleInvocation,
    SearchOracle, SearchOutcome, SearchStatus,
};
pub use parser::{parse_hole_assignment, ProtocolError};
