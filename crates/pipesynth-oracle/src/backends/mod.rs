//! Process-backed oracle implementations.

pub mod equivalence;
pub mod search;

pub use equivalence::ProcessEquivalenceOracle;
pub use search::ProcessSearchOracle;
