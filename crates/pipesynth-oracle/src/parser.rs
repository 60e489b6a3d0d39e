//! Result Parser: hole bindings out of raw oracle transcripts.
//!
//! Output grammar, shared with the counterexample parser:
//!
//! ```text
//! binding := [type-keyword] ident ws? "=" ws? int
//! ```
//!
//! Bindings are separated by newlines, `;` or `,`. Anything that does not
//! match the grammar (log lines, comparisons such as `a == b`) is ignored.
//! An identifier binds hole `h` when it is exactly `h` or an oracle-decorated
//! form `h__<suffix>`.

use thiserror::Error;

use crate::holes::{Hole, HoleAssignment};

/// The oracle's output did not honour the binding contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("oracle output has no binding for hole `{hole}`")]
    MissingBinding { hole: String },
    #[error("oracle output binds hole `{hole}` {count} times")]
    DuplicateBinding { hole: String, count: usize },
    #[error("oracle output binds hole `{hole}` to {value}, which does not fit in {bit_width} bits")]
    ValueOutOfRange {
        hole: String,
        value: i64,
        bit_width: u32,
    },
    #[error("counterexample binds `{name}` more than once")]
    DuplicateCounterexampleVariable { name: String },
    #[error("counterexample binds `{name}`, which is neither a packet field nor a state slot")]
    UnknownCounterexampleVariable { name: String },
    #[error("equivalence output reports no counterexample but binds `{name}`")]
    ContradictoryVerdict { name: String },
    #[error("equivalence output has neither a verdict nor a counterexample: `{excerpt}`")]
    UnrecognizedEquivalenceOutput { excerpt: String },
}

/// One `ident = int` occurrence in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Binding<'t> {
    pub(crate) ident: &'t str,
    pub(crate) value: i64,
}

pub(crate) fn bindings(text: &str) -> Vec<Binding<'_>> {
    text.split(&['\n', ';', ','][..])
        .filter_map(parse_binding)
        .collect()
}

fn parse_binding(segment: &str) -> Option<Binding<'_>> {
    let eq = find_assignment_eq(segment)?;
    let ident = segment[..eq].split_whitespace().last()?;
    if !is_identifier(ident) {
        return None;
    }
    let raw = segment[eq + 1..]
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    let value = raw.parse::<i64>().ok()?;
    Some(Binding { ident, value })
}

/// Byte offset of the first lone `=` (not part of `==`, `!=`, `<=`, `>=`).
fn find_assignment_eq(segment: &str) -> Option<usize> {
    let bytes = segment.as_bytes();
    bytes.iter().enumerate().find_map(|(i, &b)| {
        if b != b'=' {
            return None;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1).copied();
        let joined_prev = matches!(prev, Some(b'=' | b'!' | b'<' | b'>'));
        let joined_next = next == Some(b'=');
        (!joined_prev && !joined_next).then_some(i)
    })
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn binds_hole(ident: &str, hole: &str) -> bool {
    match ident.strip_prefix(hole) {
        Some("") => true,
        Some(rest) => rest.starts_with("__"),
        None => false,
    }
}

/// Extract a complete [`HoleAssignment`] for `holes` from `transcript`.
///
/// Every declared hole must be bound exactly once; a missing or repeated
/// binding is reported for the first offending hole in declaration order and
/// no partial map is returned.
pub fn parse_hole_assignment(
    holes: &[Hole],
    transcript: &str,
) -> Result<HoleAssignment, ProtocolError> {
    let found = bindings(transcript);
    let mut assignment = HoleAssignment::new();
    for hole in holes {
        let mut matches = found.iter().filter(|b| binds_hole(b.ident, hole.name()));
        let binding = match (matches.next(), matches.count()) {
            (None, _) => {
                return Err(ProtocolError::MissingBinding {
                    hole: hole.name().to_string(),
                })
            }
            (Some(binding), 0) => binding,
            (Some(_), extra) => {
                return Err(ProtocolError::DuplicateBinding {
                    hole: hole.name().to_string(),
                    count: extra + 1,
                })
            }
        };
        if !hole.admits(binding.value) {
            return Err(ProtocolError::ValueOutOfRange {
                hole: hole.name().to_string(),
                value: binding.value,
                bit_width: hole.bit_width(),
            });
        }
        assignment.insert(hole.name(), binding.value);
    }
    Ok(assignment)
}
