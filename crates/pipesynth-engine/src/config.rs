//! Program and pipeline shape for one synthesis attempt.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural precondition violated before any oracle was consulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("invalid configuration JSON: {0}")]
    Parse(String),
    #[error("`{field}` must be at least 1")]
    ZeroCapacity { field: &'static str },
    #[error(
        "number of {what} ({count}) is greater than number of ALUs per stage ({alus}). \
         Try increasing number of ALUs per stage."
    )]
    AluCapacityExceeded {
        what: &'static str,
        count: usize,
        alus: usize,
    },
    #[error("{what} index {index} is out of range (program has {available})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        available: usize,
    },
    #[error("{what} index {index} is selected more than once")]
    DuplicateIndex { what: &'static str, index: usize },
    #[error("placement space {stages}^{state_groups} does not fit in memory")]
    PlacementSpaceTooLarge { stages: usize, state_groups: usize },
    #[error("constant set must not be empty")]
    EmptyConstantSet,
    #[error("configuration name `{0}` is not a valid identifier")]
    InvalidName(String),
}

/// Immutable description of the program and target pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Sketch name; prefixes placement indicator holes and artifact names.
    pub name: String,
    pub program: PathBuf,
    pub stateful_alu: PathBuf,
    pub stateless_alu: PathBuf,
    pub num_pipeline_stages: usize,
    pub num_alus_per_stage: usize,
    pub num_fields_in_prog: usize,
    pub num_state_groups: usize,
    #[serde(default)]
    pub input_packet_fields: Vec<usize>,
    #[serde(default)]
    pub output_packet_fields: Vec<usize>,
    #[serde(default)]
    pub output_state_groups: Vec<usize>,
    #[serde(default = "default_constant_set")]
    pub constant_set: Vec<i64>,
    #[serde(default)]
    pub synthesized_allocation: bool,
    #[serde(default)]
    pub parallel_solver: bool,
}

fn default_constant_set() -> Vec<i64> {
    vec![0, 1, 2, 3]
}

/// Input and output selections after defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIo {
    pub input_packet_fields: Vec<usize>,
    pub output_packet_fields: Vec<usize>,
    pub output_state_groups: Vec<usize>,
}

impl Configuration {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !is_identifier(&self.name) {
            return Err(ConfigurationError::InvalidName(self.name.clone()));
        }
        if self.num_pipeline_stages == 0 {
            return Err(ConfigurationError::ZeroCapacity {
                field: "num_pipeline_stages",
            });
        }
        if self.num_alus_per_stage == 0 {
            return Err(ConfigurationError::ZeroCapacity {
                field: "num_alus_per_stage",
            });
        }

        let alus = self.num_alus_per_stage;
        if self.input_packet_fields.is_empty() {
            check_capacity("fields in program", self.num_fields_in_prog, alus)?;
        } else {
            check_capacity("input fields", self.input_packet_fields.len(), alus)?;
            check_capacity("checked output fields", self.output_packet_fields.len(), alus)?;
        }

        check_indices("input packet field", &self.input_packet_fields, self.num_fields_in_prog)?;
        check_indices(
            "output packet field",
            &self.output_packet_fields,
            self.num_fields_in_prog,
        )?;
        check_indices("output state group", &self.output_state_groups, self.num_state_groups)?;

        if self.constant_set.is_empty() {
            return Err(ConfigurationError::EmptyConstantSet);
        }
        self.placement_count()?;
        Ok(())
    }

    /// Number of placement candidates, `stages ^ state_groups`.
    pub fn placement_count(&self) -> Result<usize, ConfigurationError> {
        u32::try_from(self.num_state_groups)
            .ok()
            .and_then(|groups| self.num_pipeline_stages.checked_pow(groups))
            .ok_or(ConfigurationError::PlacementSpaceTooLarge {
                stages: self.num_pipeline_stages,
                state_groups: self.num_state_groups,
            })
    }

    pub fn resolved_io(&self) -> ResolvedIo {
        let all_fields: Vec<usize> = (0..self.num_fields_in_prog).collect();
        let (output_packet_fields, output_state_groups) =
            match (self.output_packet_fields.is_empty(), self.output_state_groups.is_empty()) {
                (true, true) => (all_fields.clone(), (0..self.num_state_groups).collect()),
                _ => (
                    self.output_packet_fields.clone(),
                    self.output_state_groups.clone(),
                ),
            };
        let input_packet_fields = if self.input_packet_fields.is_empty() {
            all_fields
        } else {
            self.input_packet_fields.clone()
        };
        ResolvedIo {
            input_packet_fields,
            output_packet_fields,
            output_state_groups,
        }
    }

    /// Bits needed to index the constant vector.
    pub fn constant_index_bit_width(&self) -> u32 {
        let len = self.constant_set.len().max(2);
        usize::BITS - (len - 1).leading_zeros()
    }

    /// Name of the hole that is 1 iff `state_group` lives in `stage`.
    pub fn placement_indicator(&self, stage: usize, state_group: usize) -> String {
        format!("{}_salu_config_{stage}_{state_group}", self.name)
    }
}

fn check_capacity(what: &'static str, count: usize, alus: usize) -> Result<(), ConfigurationError> {
    if count > alus {
        return Err(ConfigurationError::AluCapacityExceeded { what, count, alus });
    }
    Ok(())
}

fn check_indices(
    what: &'static str,
    indices: &[usize],
    available: usize,
) -> Result<(), ConfigurationError> {
    let mut seen = BTreeSet::new();
    for &index in indices {
        if index >= available {
            return Err(ConfigurationError::IndexOutOfRange {
                what,
                index,
                available,
            });
        }
        if !seen.insert(index) {
            return Err(ConfigurationError::DuplicateIndex { what, index });
        }
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
