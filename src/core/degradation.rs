//! Graceful degradation bookkeeping.
//!
//! Detectors and renderers never abort a run on local failures. Instead they
//! record a [`Degradation`] here, and the log is rendered into every
//! artifact's provenance block so nothing is silently swallowed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a unit of work produced a reduced result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum DegradationReason {
    /// The detector exceeded its time budget
    TimedOut {
        /// Budget that was exceeded, in milliseconds
        budget_ms: u64,
    },
    /// A manifest or config file could not be parsed
    ParseFailed {
        /// File that failed to parse
        path: String,
        /// Parser message
        message: String,
    },
    /// A file could not be read
    Unreadable {
        /// I/O error message
        message: String,
    },
    /// The detector panicked
    Crashed,
    /// No detector is registered under the requested name
    UnknownDetector,
    /// A template referenced a variable with no confirmed answer
    UnresolvedVariable {
        /// Variable name as written in the template
        name: String,
    },
    /// Artifact validation reported a problem
    ValidationFinding {
        /// Finding description
        message: String,
    },
}

impl fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut { budget_ms } => write!(f, "timed out after {budget_ms}ms"),
            Self::ParseFailed { path, message } => write!(f, "could not parse {path}: {message}"),
            Self::Unreadable { message } => write!(f, "unreadable input: {message}"),
            Self::Crashed => write!(f, "crashed"),
            Self::UnknownDetector => write!(f, "is not a registered detector"),
            Self::UnresolvedVariable { name } => write!(f, "left '{{{{ {name} }}}}' unresolved"),
            Self::ValidationFinding { message } => write!(f, "{message}"),
        }
    }
}

/// A single recorded degradation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    /// What degraded (detector name or artifact name)
    pub source: String,
    /// Why it degraded
    #[serde(flatten)]
    pub reason: DegradationReason,
}

impl Degradation {
    /// Create a new degradation entry.
    pub fn new(source: impl Into<String>, reason: DegradationReason) -> Self {
        Self { source: source.into(), reason }
    }

    /// Whether this entry came from a detector timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self.reason, DegradationReason::TimedOut { .. })
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.source, self.reason)
    }
}

/// Ordered log of degradations collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DegradationLog {
    entries: Vec<Degradation>,
}

impl DegradationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a degradation.
    pub fn record(&mut self, source: impl Into<String>, reason: DegradationReason) {
        let entry = Degradation::new(source, reason);
        tracing::debug!(source = %entry.source, reason = %entry.reason, "Recorded degradation");
        self.entries.push(entry);
    }

    /// Append every entry of another log.
    pub fn extend(&mut self, other: &Self) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// All entries in the order they were recorded.
    pub fn entries(&self) -> &[Degradation] {
        &self.entries
    }

    /// Check if anything degraded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Human readable lines, one per entry.
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// Sort entries by source so logs from concurrent work compare equal.
    pub fn normalize(&mut self) {
        self.entries.sort_by(|a, b| a.source.cmp(&b.source));
    }

    /// Short summary for display.
    pub fn summary(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }

        let sources: Vec<_> = self.entries.iter().map(|d| d.source.as_str()).collect();
        format!("Degraded: {}", sources.join(", "))
    }
}
