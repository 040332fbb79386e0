//! Workflow error types.

use thiserror::Error;

/// Errors raised while loading or resolving workflow definitions.
///
/// All of these are structural: they abort a run before any detector
/// executes or any question is asked.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// An extension references a step that does not exist, or conflicts with one.
    #[error("Cannot resolve '{definition}' at step '{step}': {message}")]
    Resolution { definition: String, step: String, message: String },

    /// The extension chain revisits a definition.
    #[error("Workflow extension cycle: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// No definition with this name is known.
    #[error("Unknown workflow '{0}'")]
    UnknownWorkflow(String),

    /// A definition failed validation.
    #[error("Invalid workflow '{name}': {message}")]
    Invalid { name: String, message: String },

    /// A definition file is not valid YAML for the schema.
    #[error("Failed to parse workflow {path}: {message}")]
    Parse { path: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    pub(crate) fn resolution(
        definition: &str,
        step: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            definition: definition.to_string(),
            step: step.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(name: &str, message: impl Into<String>) -> Self {
        Self::Invalid { name: name.to_string(), message: message.into() }
    }
}
