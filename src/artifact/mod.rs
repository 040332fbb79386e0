//! Artifact generation.
//!
//! Renders the generation steps of a resolved workflow from a complete
//! answer set, scores the answers against the active threshold, attaches a
//! provenance block and publishes the result through an [`ArtifactStore`].

mod error;
mod generator;
mod provenance;
mod store;
mod template;
mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::ArtifactError;
pub use generator::{
    acceptance_score, Artifact, ArtifactGenerator, GenerationInput, ScoreWeights,
    ValidationThreshold, REVERSE_ENGINEERED,
};
pub use provenance::{AnswerRecord, ProvenanceBlock};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, StagedArtifact};
pub use template::{render, render_path, Rendered};
pub use validate::{slugify, validate_artifact, PlaceholderHit, ValidationReport, ValidationStatus};

/// Outcome of the acceptance gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactStatus {
    /// Score met the threshold and validation passed
    Accepted,
    /// Needs a human look before use
    NeedsReview,
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accepted => "accepted",
            Self::NeedsReview => "needs-review",
        })
    }
}
