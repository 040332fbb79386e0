//! Artifact error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while rendering or publishing artifacts.
///
/// A failed commit leaves the confirmed answers untouched, so generation can
/// be retried without asking anything again.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Staging, committing or discarding an artifact failed.
    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template or output path could not be rendered.
    #[error("Failed to render artifact '{name}': {message}")]
    Render { name: String, message: String },
}

impl ArtifactError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }

    pub(crate) fn render(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render { name: name.into(), message: message.into() }
    }
}
