//! Counterexamples reported by the equivalence oracle.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::parser::{bindings, ProtocolError};

/// Concrete packet-field and state-group values on which a candidate
/// pipeline disagrees with the reference program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterexample {
    packet: IndexMap<String, i64>,
    state: IndexMap<String, i64>,
}

impl Counterexample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packet(mut self, name: impl Into<String>, value: i64) -> Self {
        self.packet.insert(name.into(), value);
        self
    }

    pub fn with_state(mut self, name: impl Into<String>, value: i64) -> Self {
        self.state.insert(name.into(), value);
        self
    }

    pub fn packet(&self) -> impl Iterator<Item = (&str, i64)> {
        self.packet.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn state(&self) -> impl Iterator<Item = (&str, i64)> {
        self.state.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Packet bindings followed by state bindings.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, i64)> {
        self.packet().chain(self.state())
    }

    pub fn is_empty(&self) -> bool {
        self.packet.is_empty() && self.state.is_empty()
    }
}

impl fmt::Display for Counterexample {
    /// `pkt_0=3, state_0=0`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .bindings()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&rendered)
    }
}

fn is_packet_var(ident: &str) -> bool {
    indexed(ident, "pkt_")
}

fn is_state_var(ident: &str) -> bool {
    indexed(ident, "state_")
        || ident
            .strip_prefix("state_group_")
            .and_then(|rest| rest.split_once("_state_"))
            .is_some_and(|(group, slot)| all_digits(group) && all_digits(slot))
}

/// Names in the counterexample namespace that fit neither shape, such as
/// oracle-decorated `pkt_0__s1`.
fn is_malformed_var(ident: &str) -> bool {
    ident.starts_with("pkt_") || ident.starts_with("state_")
}

fn indexed(ident: &str, prefix: &str) -> bool {
    ident.strip_prefix(prefix).is_some_and(all_digits)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_verdict_line(line: &str) -> bool {
    let line = line.trim().trim_end_matches('.').to_ascii_lowercase();
    line == "no counterexample" || line == "no counterexample found"
}

const EXCERPT_LEN: usize = 80;

fn excerpt(transcript: &str) -> String {
    let line = transcript
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    line.chars().take(EXCERPT_LEN).collect()
}

/// Parse an equivalence-oracle transcript.
///
/// Returns `Ok(None)` only for an empty transcript or one with a line that
/// reads exactly `no counterexample` (or `no counterexample found`). Any
/// other transcript must carry at least one `pkt_<i>`/`state_<i>` binding;
/// unrelated bindings and log lines around them are ignored.
pub fn parse_counterexample(transcript: &str) -> Result<Option<Counterexample>, ProtocolError> {
    if transcript.trim().is_empty() {
        return Ok(None);
    }
    let verdict = transcript.lines().any(is_verdict_line);
    let mut cex = Counterexample::new();
    for binding in bindings(transcript) {
        let name = binding.ident.to_string();
        let target = if is_packet_var(binding.ident) {
            &mut cex.packet
        } else if is_state_var(binding.ident) {
            &mut cex.state
        } else if is_malformed_var(binding.ident) {
            return Err(ProtocolError::UnknownCounterexampleVariable { name });
        } else {
            continue;
        };
        if verdict {
            return Err(ProtocolError::ContradictoryVerdict { name });
        }
        if target.insert(name.clone(), binding.value).is_some() {
            return Err(ProtocolError::DuplicateCounterexampleVariable { name });
        }
    }
    match (verdict, cex.is_empty()) {
        (true, _) => Ok(None),
        (false, false) => Ok(Some(cex)),
        (false, true) => Err(ProtocolError::UnrecognizedEquivalenceOutput {
            excerpt: excerpt(transcript),
        }),
    }
}
