//! Workflow schema definitions.
//!
//! Defines the YAML structure for workflow definition files.

use serde::{Deserialize, Serialize};

use crate::propose::ProposalHook;

/// A workflow definition, either a root or an extension of a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Name of the workflow
    pub name: String,

    /// Description of what this workflow produces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Workflow this one extends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Validation threshold in percent, overriding the parent's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    /// Steps of a root definition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,

    /// Changes an extension applies to its parent's steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<StepChange>,

    /// Generation steps appended after the inherited ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Step>,
}

/// Step kinds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    #[default]
    Question,
    Generation,
}

/// A step in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique id, also the template variable holding the step's answer
    pub id: String,

    /// Kind of step
    #[serde(default)]
    pub kind: StepKind,

    /// Question shown to the human
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt: String,

    /// Value used when running non-interactively and nothing is proposed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Detectors whose signals propose an answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ProposalHook>,

    /// Artifact rendered by a generation step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactSpec>,
}

impl Step {
    /// Create a question step.
    pub fn question(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Question,
            prompt: prompt.into(),
            default: None,
            proposal: None,
            artifact: None,
        }
    }

    /// Create a generation step.
    pub fn generation(id: impl Into<String>, artifact: ArtifactSpec) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Generation,
            prompt: String::new(),
            default: None,
            proposal: None,
            artifact: Some(artifact),
        }
    }

    /// Attach a proposal hook.
    #[must_use]
    pub fn with_proposal(mut self, hook: ProposalHook) -> Self {
        self.proposal = Some(hook);
        self
    }

    /// Check if this is a question step.
    pub fn is_question(&self) -> bool {
        self.kind == StepKind::Question
    }
}

/// What a generation step renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    /// Output path relative to the artifact root; `{slug}` is replaced per feature
    pub output: String,

    /// Template with `{{ step-id }}` placeholders
    pub template: String,

    /// Render once per discovered feature
    #[serde(default)]
    pub per_feature: bool,

    /// Section ids (`A`, `B`, ...) that must appear as `## A. Title` headings, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_sections: Vec<String>,
}

/// Where an inserted step goes relative to its anchor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Before,
    After,
}

/// One change an extension applies to the accumulated steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StepChange {
    /// Insert a new step next to an existing one
    Insert { position: Position, anchor: String, step: Step },

    /// Replace a question step's proposal hook
    Override { step: String, proposal: ProposalHook },

    /// Append text to a question step's prompt
    Append { step: String, text: String },
}

impl StepChange {
    /// Id of the existing step this change refers to.
    pub fn target(&self) -> &str {
        match self {
            Self::Insert { anchor, .. } => anchor,
            Self::Override { step, .. } | Self::Append { step, .. } => step,
        }
    }
}

impl WorkflowDefinition {
    /// Check if this definition extends another.
    pub fn is_extension(&self) -> bool {
        self.parent.is_some()
    }

    /// Every step id this definition introduces.
    pub fn introduced_ids(&self) -> Vec<&str> {
        let inserted = self.changes.iter().filter_map(|c| match c {
            StepChange::Insert { step, .. } => Some(step.id.as_str()),
            _ => None,
        });
        self.steps
            .iter()
            .map(|s| s.id.as_str())
            .chain(inserted)
            .chain(self.actions.iter().map(|s| s.id.as_str()))
            .collect()
    }
}
