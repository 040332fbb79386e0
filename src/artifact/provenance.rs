//! Provenance recorded with every artifact.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ArtifactStatus;
use crate::session::{AnswerOrigin, ConfirmedAnswer};

/// How one answer was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Step the answer belongs to
    pub step_id: String,

    /// Where the value came from
    pub origin: AnswerOrigin,

    /// Recorded confidence, 0.0 - 1.0
    pub confidence: f64,
}

impl From<&ConfirmedAnswer> for AnswerRecord {
    fn from(answer: &ConfirmedAnswer) -> Self {
        Self {
            step_id: answer.step_id().to_string(),
            origin: answer.origin(),
            confidence: answer.confidence(),
        }
    }
}

/// Derivation metadata attached to an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceBlock {
    /// Codebase the answers were derived from
    pub codebase: String,

    /// Generation time, UTC
    pub generated_at: DateTime<Utc>,

    /// Outermost workflow definition
    pub workflow: String,

    /// Definitions applied, root first
    pub chain: Vec<String>,

    /// Per-answer origin and confidence, in step order
    pub answers: Vec<AnswerRecord>,

    /// Acceptance score, percent
    pub score: f64,

    /// Threshold the score was compared against, percent
    pub threshold: f64,

    /// Acceptance result
    pub status: ArtifactStatus,

    /// Status marker such as `reverse-engineered`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,

    /// Degradations and validation findings
    pub notes: Vec<String>,

    /// SHA-256 of the rendered body, hex encoded
    pub digest: String,
}

impl ProvenanceBlock {
    /// Hex-encoded SHA-256 of `content`.
    pub fn digest_of(content: &str) -> String {
        let hash = Sha256::digest(content.as_bytes());
        hash.iter().fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
    }

    /// Pretty JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Markdown section appended to the artifact.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "## Provenance");
        let _ = writeln!(out);
        let _ = writeln!(out, "- **Status**: {}", self.status);
        if let Some(marker) = &self.marker {
            let _ = writeln!(out, "- **Marker**: {marker}");
        }
        let _ = writeln!(out, "- **Codebase**: `{}`", self.codebase);
        let _ = writeln!(
            out,
            "- **Generated**: {}",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let _ = writeln!(out, "- **Workflow**: {}", self.workflow);
        let _ = writeln!(out, "- **Extension chain**: {}", self.chain.join(" -> "));
        let _ = writeln!(
            out,
            "- **Acceptance**: {:.2}% (threshold {:.2}%)",
            self.score, self.threshold
        );
        let _ = writeln!(out, "- **Digest**: `sha256:{}`", self.digest);
        let _ = writeln!(out);
        let _ = writeln!(out, "| Step | Origin | Confidence |");
        let _ = writeln!(out, "|---|---|---|");
        for answer in &self.answers {
            let _ = writeln!(
                out,
                "| {} | {} | {:.2} |",
                answer.step_id, answer.origin, answer.confidence
            );
        }
        if !self.notes.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Notes:");
            let _ = writeln!(out);
            for note in &self.notes {
                let _ = writeln!(out, "- {note}");
            }
        }
        out
    }
}
