//! Renders confirmed answers into artifacts and applies the acceptance gate.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::provenance::{AnswerRecord, ProvenanceBlock};
use super::template::{render, render_path};
use super::validate::{slugify, validate_artifact, ValidationReport};
use super::{ArtifactError, ArtifactStatus, ArtifactStore, StagedArtifact};
use crate::core::config::ArtifactConfig;
use crate::core::{Config, DegradationLog, DegradationReason};
use crate::detect::{kinds, Signal};
use crate::session::AnswerSet;
use crate::workflow::{ArtifactSpec, ResolvedWorkflow, Step};

/// Marker attached to artifacts rendered once per discovered feature.
pub const REVERSE_ENGINEERED: &str = "reverse-engineered";

/// Acceptance bar in percent, 0 - 100.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ValidationThreshold(f64);

impl ValidationThreshold {
    /// Create a threshold; values outside 0 - 100 are clamped.
    pub fn new(percent: f64) -> Self {
        Self(percent.clamp(0.0, 100.0))
    }

    /// The threshold in percent.
    pub fn percent(self) -> f64 {
        self.0
    }

    /// A score at or above the threshold is accepted.
    pub fn accepts(self, score: f64) -> bool {
        score >= self.0
    }
}

impl Default for ValidationThreshold {
    fn default() -> Self {
        Self(90.0)
    }
}

/// Weights applied per answer origin in the acceptance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Weight of proposed and edited answers
    pub proposed: f64,

    /// Weight of manually entered answers
    pub manual: f64,
}

impl ScoreWeights {
    /// Weights from the artifact configuration.
    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self { proposed: config.proposed_weight, manual: config.manual_weight }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::from_config(&ArtifactConfig::default())
    }
}

/// Weighted mean of answer confidences, in percent rounded to two decimals.
///
/// An empty answer set scores 0.
pub fn acceptance_score(answers: &AnswerSet, weights: ScoreWeights) -> f64 {
    let (weighted, total) = answers.iter().fold((0.0, 0.0), |(weighted, total), answer| {
        let weight = if answer.origin().is_proposed() { weights.proposed } else { weights.manual };
        (weighted + weight * answer.confidence(), total + weight)
    });
    if total <= 0.0 {
        return 0.0;
    }
    (weighted / total * 100.0 * 100.0).round() / 100.0
}

/// A rendered artifact ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Output name relative to the artifact root
    pub name: String,

    /// Generation step that produced it
    pub step_id: String,

    /// Rendered template
    pub body: String,

    /// Body followed by the provenance section
    pub document: String,

    /// Acceptance result
    pub status: ArtifactStatus,

    /// Structural check of the body
    pub validation: ValidationReport,

    /// Derivation metadata
    pub provenance: ProvenanceBlock,
}

impl Artifact {
    /// Check if the artifact passed the acceptance gate.
    pub fn is_accepted(&self) -> bool {
        self.status == ArtifactStatus::Accepted
    }
}

/// Everything a generation run consumes.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    /// Resolved workflow whose generation steps are rendered
    pub workflow: &'a ResolvedWorkflow,

    /// Complete answer set
    pub answers: &'a AnswerSet,

    /// Signals from detection; `feature` signals drive per-feature steps
    pub signals: &'a [Signal],

    /// Degradations recorded during detection
    pub degradations: &'a DegradationLog,

    /// Codebase the answers describe
    pub codebase: &'a Path,

    /// Timestamp recorded in provenance
    pub generated_at: DateTime<Utc>,
}

/// Renders generation steps and gates them against the threshold.
#[derive(Debug, Clone, Default)]
pub struct ArtifactGenerator {
    weights: ScoreWeights,
    default_threshold: ValidationThreshold,
}

impl ArtifactGenerator {
    /// Create a generator.
    pub fn new(weights: ScoreWeights, default_threshold: ValidationThreshold) -> Self {
        Self { weights, default_threshold }
    }

    /// Generator using configured weights and default threshold.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ScoreWeights::from_config(&config.artifacts),
            ValidationThreshold::new(config.general.threshold),
        )
    }

    /// Threshold active for a workflow.
    pub fn threshold_for(&self, workflow: &ResolvedWorkflow) -> ValidationThreshold {
        workflow.threshold.map_or(self.default_threshold, ValidationThreshold::new)
    }

    /// Render every generation step of the workflow.
    pub fn generate(&self, input: &GenerationInput<'_>) -> Result<Vec<Artifact>, ArtifactError> {
        let score = acceptance_score(input.answers, self.weights);
        let threshold = self.threshold_for(input.workflow);
        let base_vars = input.answers.values();

        tracing::info!(
            workflow = input.workflow.name.as_str(),
            score,
            threshold = threshold.percent(),
            "Computed acceptance score"
        );

        let mut artifacts = Vec::new();
        let mut names = BTreeSet::new();
        for step in input.workflow.generations() {
            let Some(spec) = &step.artifact else {
                return Err(ArtifactError::render(&step.id, "generation step has no artifact"));
            };

            for (name, vars, marker) in self.expand(step, spec, &base_vars, input.signals) {
                if !names.insert(name.clone()) {
                    tracing::warn!(artifact = name.as_str(), step = step.id.as_str(), "Skipping duplicate artifact name");
                    continue;
                }
                let artifact =
                    self.render_one(input, step, spec, name, &vars, marker, score, threshold);
                artifacts.push(artifact);
            }
        }
        Ok(artifacts)
    }

    /// Output names and variables for one step: once, or once per feature.
    fn expand(
        &self,
        step: &Step,
        spec: &ArtifactSpec,
        base_vars: &BTreeMap<String, String>,
        signals: &[Signal],
    ) -> Vec<(String, BTreeMap<String, String>, Option<String>)> {
        if !spec.per_feature {
            return vec![(spec.output.clone(), base_vars.clone(), None)];
        }

        let features: Vec<&Signal> = signals.iter().filter(|s| s.kind == kinds::FEATURE).collect();
        if features.is_empty() {
            tracing::info!(step = step.id.as_str(), "No features discovered, nothing to render");
        }

        features
            .into_iter()
            .filter_map(|feature| {
                let name = feature.value()?;
                let slug = feature.get("slug").map_or_else(|| slugify(name), str::to_string);
                if slug.is_empty() {
                    return None;
                }
                let mut vars = base_vars.clone();
                vars.insert("feature.name".to_string(), name.to_string());
                vars.insert("feature.path".to_string(), feature.get("path").unwrap_or_default().to_string());
                vars.insert("feature.slug".to_string(), slug.clone());
                Some((render_path(&spec.output, &slug), vars, Some(REVERSE_ENGINEERED.to_string())))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn render_one(
        &self,
        input: &GenerationInput<'_>,
        step: &Step,
        spec: &ArtifactSpec,
        name: String,
        vars: &BTreeMap<String, String>,
        marker: Option<String>,
        score: f64,
        threshold: ValidationThreshold,
    ) -> Artifact {
        let rendered = render(&spec.template, vars);
        let mut body = rendered.text;
        if !body.ends_with('\n') {
            body.push('\n');
        }

        let mut notes = input.degradations.clone();
        for variable in rendered.unresolved {
            notes.record(&name, DegradationReason::UnresolvedVariable { name: variable });
        }
        let validation = validate_artifact(&body, &spec.required_sections);
        for finding in validation.findings() {
            notes.record(&name, DegradationReason::ValidationFinding { message: finding });
        }

        let status = if threshold.accepts(score) && validation.passed() {
            ArtifactStatus::Accepted
        } else {
            ArtifactStatus::NeedsReview
        };

        let provenance = ProvenanceBlock {
            codebase: input.codebase.display().to_string(),
            generated_at: input.generated_at,
            workflow: input.workflow.name.clone(),
            chain: input.workflow.chain.clone(),
            answers: input.answers.iter().map(AnswerRecord::from).collect(),
            score,
            threshold: threshold.percent(),
            status,
            marker,
            notes: notes.messages(),
            digest: ProvenanceBlock::digest_of(&body),
        };
        let document = format!("{body}\n{}", provenance.to_markdown());

        tracing::debug!(artifact = name.as_str(), step = step.id.as_str(), status = %status, "Rendered artifact");
        Artifact { name, step_id: step.id.clone(), body, document, status, validation, provenance }
    }

    /// Stage every artifact, then commit them.
    ///
    /// Nothing becomes visible if staging fails. A failed commit discards
    /// whatever is still staged; artifacts committed before it stay.
    pub fn publish(
        &self,
        store: &dyn ArtifactStore,
        artifacts: &[Artifact],
    ) -> Result<Vec<PathBuf>, ArtifactError> {
        let mut staged: Vec<StagedArtifact> = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            match store.stage(&artifact.name, &artifact.document) {
                Ok(s) => staged.push(s),
                Err(e) => {
                    discard_all(store, staged);
                    return Err(e);
                }
            }
        }

        let mut committed = Vec::with_capacity(staged.len());
        let mut pending = staged.into_iter();
        while let Some(next) = pending.next() {
            match store.commit(next) {
                Ok(path) => committed.push(path),
                Err(e) => {
                    discard_all(store, pending.collect());
                    return Err(e);
                }
            }
        }
        Ok(committed)
    }
}

fn discard_all(store: &dyn ArtifactStore, staged: Vec<StagedArtifact>) {
    for s in staged {
        if let Err(e) = store.discard(s) {
            tracing::warn!(error = %e, "Failed to discard staged artifact");
        }
    }
}
