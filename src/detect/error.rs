//! Detector error types.

use std::fmt::Display;
use std::path::Path;

use thiserror::Error;

use crate::core::DegradationReason;

/// Errors a detector can report.
///
/// None of these abort an extraction run: the extractor converts each into
/// an empty signal list plus a degradation note.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Detector exceeded its time budget.
    #[error("Detector '{detector}' timed out after {budget_ms}ms")]
    Timeout { detector: String, budget_ms: u64 },

    /// A manifest or config file is malformed.
    #[error("Failed to parse {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// A glob pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    /// Build a parse error for a file.
    pub fn parse(path: &Path, err: impl Display) -> Self {
        Self::ManifestParse { path: path.display().to_string(), message: err.to_string() }
    }

    /// Whether this error means the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Convert into the note recorded in provenance.
    pub fn into_reason(self) -> DegradationReason {
        match self {
            Self::Timeout { budget_ms, .. } => DegradationReason::TimedOut { budget_ms },
            Self::ManifestParse { path, message } => {
                DegradationReason::ParseFailed { path, message }
            }
            Self::Pattern { pattern, message } => DegradationReason::ParseFailed {
                path: pattern,
                message,
            },
            Self::Io(e) => DegradationReason::Unreadable { message: e.to_string() },
        }
    }
}
