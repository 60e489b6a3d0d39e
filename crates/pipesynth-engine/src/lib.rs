#![doc = include_str!("../README.md")]

//! Pipeline synthesis engine.
//!
//! This crate owns the orchestration layer: configuration validation, the
//! append-only constraint log, placement enumeration and parallel search,
//! and the counterexample-guided refinement loop. Encoding and solving are
//! delegated through the [`encoder::Encoder`] and `pipesynth_oracle` traits.

pub mod artifacts;
pub mod cegis;
pub mod config;
pub mod constraints;
pub mod encoder;
pub mod error;
pub mod placement;
pub mod refine;
pub mod result;
pub mod search;
mod timeout;

pub use cegis::{CegisController, CegisOptions, SearchStrategy};
pub use config::{Configuration, ConfigurationError};
pub use constraints::{Constraint, ConstraintOrigin, ConstraintSet};
pub use error::SynthesisError;
pub use refine::RefinementStrategy;
pub use result::{CegisReport, SynthesisOutcome};
