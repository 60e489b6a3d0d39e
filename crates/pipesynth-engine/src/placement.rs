//! Placement candidates: total maps from state group to pipeline stage.

use std::fmt;

use serde::Serialize;

use crate::config::Configuration;
use crate::constraints::{Constraint, ConstraintOrigin, ConstraintSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub index: usize,
    /// `stages[g]` is the stage state group `g` is placed in.
    pub stages: Vec<usize>,
}

impl Placement {
    /// Decode candidate `index` of the `stages ^ state_groups` space. The
    /// last state group varies fastest, so index 0 puts everything in stage 0.
    pub fn from_index(index: usize, num_stages: usize, num_state_groups: usize) -> Self {
        let mut stages = vec![0; num_state_groups];
        let mut rest = index;
        for slot in stages.iter_mut().rev() {
            *slot = rest % num_stages;
            rest /= num_stages;
        }
        Self { index, stages }
    }

    /// One equality per (stage, state group) pair pinning the indicator hole
    /// to 1 for the chosen stage and 0 elsewhere.
    pub fn constraints(&self, config: &Configuration) -> Vec<Constraint> {
        let origin = ConstraintOrigin::Placement {
            candidate: self.index,
        };
        let mut out = Vec::with_capacity(self.stages.len() * config.num_pipeline_stages);
        for (group, &chosen) in self.stages.iter().enumerate() {
            for stage in 0..config.num_pipeline_stages {
                let value = u8::from(stage == chosen);
                out.push(Constraint::new(
                    origin.clone(),
                    format!("{} == {value}", config.placement_indicator(stage, group)),
                ));
            }
        }
        out
    }

    pub fn constrain(&self, config: &Configuration, base: &ConstraintSet) -> ConstraintSet {
        base.extended(self.constraints(config))
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .stages
            .iter()
            .enumerate()
            .map(|(group, stage)| format!("group {group} -> stage {stage}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "#{} [{rendered}]", self.index)
    }
}

/// All placement candidates of `config`, in index order.
pub fn placements(config: &Configuration) -> impl Iterator<Item = Placement> + '_ {
    let count = config.placement_count().unwrap_or(0);
    (0..count).map(move |index| {
        Placement::from_index(index, config.num_pipeline_stages, config.num_state_groups)
    })
}
