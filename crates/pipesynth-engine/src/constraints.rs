//! Append-only constraint log.
//!
//! A [`ConstraintSet`] is a persistent singly-linked list: appending returns a
//! new set that shares every earlier entry with its parent. Sets handed out
//! for earlier CEGIS iterations (or for sibling placements) therefore stay
//! valid and can be replayed independently.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Where a constraint came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintOrigin {
    /// Supplied by the caller before the first iteration.
    Base,
    /// Placement indicator pinned for one placement candidate.
    Placement { candidate: usize },
    /// Derived from the counterexample of a failed verification round.
    Counterexample { iteration: usize },
    /// Forbids an assignment rejected in a failed verification round.
    Elimination { iteration: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub origin: ConstraintOrigin,
    pub predicate: String,
}

impl Constraint {
    pub fn new(origin: ConstraintOrigin, predicate: impl Into<String>) -> Self {
        Self {
            origin,
            predicate: predicate.into(),
        }
    }

    pub fn base(predicate: impl Into<String>) -> Self {
        Self::new(ConstraintOrigin::Base, predicate)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.predicate)
    }
}

struct Node {
    constraint: Constraint,
    parent: Option<Arc<Node>>,
    len: usize,
}

impl Drop for Node {
    /// Unlinks the chain iteratively so that dropping a long set does not
    /// recurse once per entry. Stops at the first node another set still
    /// holds.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            parent = match Arc::try_unwrap(node) {
                Ok(mut node) => node.parent.take(),
                Err(_) => None,
            };
        }
    }
}

#[derive(Clone, Default)]
pub struct ConstraintSet {
    head: Option<Arc<Node>>,
}

impl fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// A new set with `constraint` appended; `self` is unchanged.
    #[must_use]
    pub fn with(&self, constraint: Constraint) -> Self {
        Self {
            head: Some(Arc::new(Node {
                constraint,
                parent: self.head.clone(),
                len: self.len() + 1,
            })),
        }
    }

    #[must_use]
    pub fn extended<I: IntoIterator<Item = Constraint>>(&self, constraints: I) -> Self {
        constraints
            .into_iter()
            .fold(self.clone(), |set, constraint| set.with(constraint))
    }

    /// Constraints in insertion order.
    pub fn to_vec(&self) -> Vec<&Constraint> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            out.push(&node.constraint);
            cursor = node.parent.as_deref();
        }
        out.reverse();
        out
    }

    pub fn predicates(&self) -> Vec<String> {
        self.to_vec()
            .into_iter()
            .map(|c| c.predicate.clone())
            .collect()
    }

    /// Whether `self` was built by appending at least one constraint to
    /// `earlier`. Checked structurally, not by predicate text.
    pub fn strictly_extends(&self, earlier: &ConstraintSet) -> bool {
        if self.len() <= earlier.len() {
            return false;
        }
        let mut cursor = self.head.as_ref();
        while let Some(node) = cursor {
            if node.len == earlier.len() {
                return earlier.head.as_ref().is_some_and(|e| Arc::ptr_eq(e, node));
            }
            cursor = node.parent.as_ref();
        }
        earlier.is_empty()
    }
}

impl Serialize for ConstraintSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_vec())
    }
}
