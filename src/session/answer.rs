//! Confirmed answers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::propose::Proposal;

/// How a confirmed answer came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerOrigin {
    /// A proposal was accepted unchanged
    Proposed,
    /// A proposal was accepted after the human changed its value
    Edited,
    /// No proposal was used; the human typed the value
    ManuallyEntered,
}

impl AnswerOrigin {
    /// Whether the answer was derived from a proposal.
    pub fn is_proposed(self) -> bool {
        matches!(self, Self::Proposed | Self::Edited)
    }
}

impl fmt::Display for AnswerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Proposed => "proposed",
            Self::Edited => "edited",
            Self::ManuallyEntered => "manually-entered",
        };
        f.write_str(s)
    }
}

/// The human-ratified value of one question step.
///
/// Only the interaction session creates these, and they cannot be changed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedAnswer {
    step_id: String,
    value: String,
    origin: AnswerOrigin,
    confidence: f64,
}

impl ConfirmedAnswer {
    pub(crate) fn proposed(proposal: &Proposal) -> Self {
        Self {
            step_id: proposal.step_id.clone(),
            value: proposal.value.clone(),
            origin: AnswerOrigin::Proposed,
            confidence: proposal.confidence,
        }
    }

    pub(crate) fn edited(proposal: &Proposal, value: impl Into<String>) -> Self {
        Self {
            step_id: proposal.step_id.clone(),
            value: value.into(),
            origin: AnswerOrigin::Edited,
            confidence: proposal.confidence,
        }
    }

    pub(crate) fn manual(step_id: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            step_id: step_id.into(),
            value: value.into(),
            origin: AnswerOrigin::ManuallyEntered,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Step this answer belongs to.
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Final value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Where the value came from.
    pub fn origin(&self) -> AnswerOrigin {
        self.origin
    }

    /// Confidence recorded with the answer, 0.0 - 1.0.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Every answer of a finished session, in step order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: Vec<ConfirmedAnswer>,
}

impl AnswerSet {
    pub(crate) fn from_answers(answers: Vec<ConfirmedAnswer>) -> Self {
        Self { answers }
    }

    /// Look up the answer to a step.
    pub fn get(&self, step_id: &str) -> Option<&ConfirmedAnswer> {
        self.answers.iter().find(|a| a.step_id == step_id)
    }

    /// Answers in step order.
    pub fn iter(&self) -> std::slice::Iter<'_, ConfirmedAnswer> {
        self.answers.iter()
    }

    /// Values keyed by step id, as used for template rendering.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.answers.iter().map(|a| (a.step_id.clone(), a.value.clone())).collect()
    }

    /// Number of answers.
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Check if there are no answers.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl<'a> IntoIterator for &'a AnswerSet {
    type Item = &'a ConfirmedAnswer;
    type IntoIter = std::slice::Iter<'a, ConfirmedAnswer>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.iter()
    }
}
