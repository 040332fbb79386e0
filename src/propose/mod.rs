//! Proposal synthesis.
//!
//! Turns detector signals into ranked candidate answers for question steps.

mod engine;

pub use engine::{combine_confidences, normalize_value, ProposalEngine};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detect::{Signal, VALUE_KEY};

fn default_value_key() -> String {
    VALUE_KEY.to_string()
}

/// Links a question step to the detectors whose signals answer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalHook {
    /// Detectors consulted for this step
    pub detectors: Vec<String>,

    /// Signal kind that carries candidate answers
    pub kind: String,

    /// Payload key holding the candidate value
    #[serde(default = "default_value_key")]
    pub value_key: String,
}

impl ProposalHook {
    /// Create a hook reading the default `value` payload key.
    pub fn new<I, S>(detectors: I, kind: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            detectors: detectors.into_iter().map(Into::into).collect(),
            kind: kind.into(),
            value_key: default_value_key(),
        }
    }

    /// Whether a signal is relevant to this hook.
    pub fn accepts(&self, signal: &Signal) -> bool {
        signal.kind == self.kind && self.detectors.iter().any(|d| *d == signal.detector)
    }
}

/// A candidate answer for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Step this proposal answers
    pub step_id: String,

    /// Candidate value shown to the human
    pub value: String,

    /// Combined confidence in the range 0.0 - 1.0
    pub confidence: f64,

    /// Signals that agreed on this value, in canonical order
    pub rationale: Vec<Signal>,
}

impl Proposal {
    /// Names of the detectors that contributed, deduplicated.
    pub fn detectors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rationale.iter().map(|s| s.detector.as_str()).collect();
        names.dedup();
        names
    }

    /// One-line explanation, e.g. `npm: package.json (express)`.
    pub fn summary(&self) -> String {
        self.rationale
            .iter()
            .map(|s| {
                let mut line = s.detector.clone();
                if let Some(path) = s.get("path") {
                    line.push_str(": ");
                    line.push_str(path);
                }
                if let Some(evidence) = s.get("evidence") {
                    line.push_str(&format!(" ({evidence})"));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Ranked proposals for every step of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalSet {
    by_step: BTreeMap<String, Vec<Proposal>>,
}

impl ProposalSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the proposals of a step; an empty list removes the step.
    pub fn insert(&mut self, step_id: impl Into<String>, proposals: Vec<Proposal>) {
        let step_id = step_id.into();
        if proposals.is_empty() {
            self.by_step.remove(&step_id);
        } else {
            self.by_step.insert(step_id, proposals);
        }
    }

    /// All proposals for a step, best first.
    pub fn for_step(&self, step_id: &str) -> &[Proposal] {
        self.by_step.get(step_id).map_or(&[], Vec::as_slice)
    }

    /// The top-ranked proposal for a step.
    pub fn top(&self, step_id: &str) -> Option<&Proposal> {
        self.for_step(step_id).first()
    }

    /// Every proposal after the top one.
    pub fn alternatives(&self, step_id: &str) -> &[Proposal] {
        self.for_step(step_id).get(1..).unwrap_or(&[])
    }

    /// Steps that have at least one proposal, sorted by id.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.by_step.keys().map(String::as_str)
    }

    /// Number of steps with proposals.
    pub fn len(&self) -> usize {
        self.by_step.len()
    }

    /// Check if no step has a proposal.
    pub fn is_empty(&self) -> bool {
        self.by_step.is_empty()
    }
}
