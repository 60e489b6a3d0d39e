//! Turning a failed verification into a new constraint.

use pipesynth_oracle::{Counterexample, HoleAssignment};
use serde::{Deserialize, Serialize};

use crate::constraints::{Constraint, ConstraintOrigin, ConstraintSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefinementStrategy {
    /// Require the pipeline to agree with the program on the counterexample
    /// input. Prunes every candidate that fails on that input.
    #[default]
    Counterexample,
    /// Forbid exactly the rejected assignment.
    HoleElimination,
}

/// `pipeline(pkt_0=3, state_0=0) == program(pkt_0=3, state_0=0)`
pub fn counterexample_constraint(cex: &Counterexample, iteration: usize) -> Constraint {
    Constraint::new(
        ConstraintOrigin::Counterexample { iteration },
        format!("pipeline({cex}) == program({cex})"),
    )
}

/// `!(h1 == v1 && h2 == v2 && 1)`. The trailing `1` keeps the conjunction
/// well formed for an empty assignment.
pub fn elimination_constraint(assignment: &HoleAssignment, iteration: usize) -> Constraint {
    let mut conjunction = String::new();
    for (hole, value) in assignment.iter() {
        conjunction.push_str(&format!("{hole} == {value} && "));
    }
    conjunction.push('1');
    Constraint::new(
        ConstraintOrigin::Elimination { iteration },
        format!("!({conjunction})"),
    )
}

/// Append the refinement for a rejected `assignment`. The result always
/// strictly extends `constraints`.
#[must_use]
pub fn refine(
    strategy: RefinementStrategy,
    constraints: &ConstraintSet,
    assignment: &HoleAssignment,
    cex: &Counterexample,
    iteration: usize,
) -> ConstraintSet {
    let constraint = match strategy {
        RefinementStrategy::Counterexample if !cex.is_empty() => {
            counterexample_constraint(cex, iteration)
        }
        _ => elimination_constraint(assignment, iteration),
    };
    constraints.with(constraint)
}
