//! Holes and hole assignments.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named unknown the search oracle assigns a value to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hole {
    name: String,
    bit_width: u32,
}

impl Hole {
    pub fn new(name: impl Into<String>, bit_width: u32) -> Self {
        Self {
            name: name.into(),
            bit_width,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Whether `value` is representable as an unsigned value of this hole's width.
    pub fn admits(&self, value: i64) -> bool {
        if value < 0 {
            return false;
        }
        if self.bit_width >= 63 {
            return true;
        }
        value < (1i64 << self.bit_width)
    }
}

/// Hole name to value mapping, kept in the order the holes were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoleAssignment {
    values: IndexMap<String, i64>,
}

impl HoleAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hole: impl Into<String>, value: i64) -> Option<i64> {
        self.values.insert(hole.into(), value)
    }

    pub fn get(&self, hole: &str) -> Option<i64> {
        self.values.get(hole).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Declared holes that have no entry in this assignment.
    pub fn missing<'h>(&self, holes: &'h [Hole]) -> Vec<&'h str> {
        holes
            .iter()
            .filter(|hole| !self.values.contains_key(hole.name()))
            .map(Hole::name)
            .collect()
    }

    pub fn is_complete(&self, holes: &[Hole]) -> bool {
        self.missing(holes).is_empty()
    }

    /// Render as `int <hole> = <value>;` lines, the format accepted back by
    /// [`crate::parse_hole_assignment`].
    pub fn to_holes_file(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.values {
            out.push_str(&format!("int {name} = {value};\n"));
        }
        out
    }
}

impl FromIterator<(String, i64)> for HoleAssignment {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_respects_bit_width() {
        let hole = Hole::new("h", 2);
        assert!(hole.admits(0));
        assert!(hole.admits(3));
        assert!(!hole.admits(4));
        assert!(!hole.admits(-1));
        assert!(Hole::new("wide", 64).admits(i64::MAX));
    }

    #[test]
    fn missing_lists_undeclared_entries_in_declaration_order() {
        let holes = vec![Hole::new("a", 1), Hole::new("b", 1), Hole::new("c", 1)];
        let assignment: HoleAssignment = [("b".to_string(), 1)].into_iter().collect();
        assert_eq!(assignment.missing(&holes), vec!["a", "c"]);
        assert!(!assignment.is_complete(&holes));
    }

    #[test]
    fn holes_file_preserves_insertion_order() {
        let mut assignment = HoleAssignment::new();
        assignment.insert("z_hole", 3);
        assignment.insert("a_hole", 0);
        assert_eq!(assignment.to_holes_file(), "int z_hole = 3;\nint a_hole = 0;\n");
    }
}
