//! End-to-end run: resolve, detect, propose, ask, generate.
//!
//! Resolution always happens first so structural workflow errors abort the
//! run before any detector touches the codebase.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::artifact::{Artifact, ArtifactGenerator, FsArtifactStore, GenerationInput};
use crate::core::Config;
use crate::detect::{DetectionReport, SignalExtractor};
use crate::propose::{ProposalEngine, ProposalSet};
use crate::session::{Interactor, Session, SessionError, SessionSettings, SessionState};
use crate::workflow::{ResolvedWorkflow, WorkflowCatalog, WorkflowError};

/// Process exit codes.
pub mod exit {
    /// Every artifact was accepted
    pub const SUCCESS: i32 = 0;
    /// The run failed
    pub const ERROR: i32 = 1;
    /// Artifacts were written but at least one needs review
    pub const NEEDS_REVIEW: i32 = 2;
    /// The session was interrupted; progress is in the state file
    pub const INTERRUPTED: i32 = 130;
}

/// Detector that discovers feature units for per-feature actions.
const FEATURE_DETECTOR: &str = "features";

/// A workflow resolved against a codebase with its proposals computed.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The resolved workflow
    pub workflow: ResolvedWorkflow,

    /// Signals and degradations from detection
    pub report: DetectionReport,

    /// Ranked proposals per question step
    pub proposals: ProposalSet,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Generated artifacts
    pub artifacts: Vec<Artifact>,

    /// Where they were committed
    pub paths: Vec<PathBuf>,
}

impl RunReport {
    /// Exit code for the run: success when every artifact was accepted.
    pub fn exit_code(&self) -> i32 {
        if self.artifacts.iter().all(Artifact::is_accepted) {
            exit::SUCCESS
        } else {
            exit::NEEDS_REVIEW
        }
    }
}

/// Ties the catalog, extractor, session and generator together for one codebase.
#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    config: Config,
    catalog: WorkflowCatalog,
    publishing: Arc<AtomicBool>,
}

impl Pipeline {
    /// Discover workflows for the codebase at `root`.
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Result<Self, WorkflowError> {
        let root = root.into();
        let catalog = WorkflowCatalog::discover(&root, &config.general.workflow_dirs)?;
        Ok(Self::with_catalog(root, config, catalog))
    }

    /// Use an explicit catalog instead of discovering one.
    pub fn with_catalog(root: impl Into<PathBuf>, config: Config, catalog: WorkflowCatalog) -> Self {
        Self { root: root.into(), config, catalog, publishing: Arc::new(AtomicBool::new(false)) }
    }

    /// Flag that is set while artifacts are generated and published.
    ///
    /// Signal handlers read it to avoid exiting between stage and commit.
    pub fn publishing(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.publishing)
    }

    /// The codebase root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Known workflow definitions.
    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    /// Resolve a workflow by name.
    pub fn resolve(&self, name: &str) -> Result<ResolvedWorkflow, WorkflowError> {
        self.catalog.resolve(name)
    }

    /// Detectors a workflow needs, limited to the enabled ones.
    pub fn detectors_for(&self, workflow: &ResolvedWorkflow) -> Vec<String> {
        let mut wanted: BTreeSet<String> = workflow
            .questions()
            .filter_map(|step| step.proposal.as_ref())
            .flat_map(|hook| hook.detectors.iter().cloned())
            .collect();
        let per_feature = workflow
            .generations()
            .any(|step| step.artifact.as_ref().is_some_and(|a| a.per_feature));
        if per_feature {
            wanted.insert(FEATURE_DETECTOR.to_string());
        }

        let enabled = &self.config.detection.enabled;
        wanted
            .into_iter()
            .filter(|name| {
                let on = enabled.contains(name);
                if !on {
                    tracing::debug!(detector = name.as_str(), "Detector disabled in configuration");
                }
                on
            })
            .collect()
    }

    /// Run detectors over the codebase.
    pub fn detect(&self, names: &[String]) -> anyhow::Result<DetectionReport> {
        let extractor = SignalExtractor::from_config(&self.root, &self.config);
        extractor.extract_blocking(names)
    }

    /// Resolve a workflow, run its detectors and synthesize proposals.
    pub fn prepare(&self, name: &str) -> anyhow::Result<Prepared> {
        let workflow = self.resolve(name)?;
        let detectors = self.detectors_for(&workflow);
        tracing::info!(workflow = workflow.name.as_str(), detectors = ?detectors, "Running detection");

        let report = self.detect(&detectors)?;
        let proposals = ProposalEngine::new().propose(&workflow, &report.signals);
        Ok(Prepared { workflow, report, proposals })
    }

    /// Answer every question step, then generate and publish artifacts.
    ///
    /// With a `state_path`, progress is saved after every answer and an
    /// existing state file is resumed. The file is removed once artifacts
    /// are committed. Interruption surfaces as [`SessionError::Interrupted`].
    pub fn run(
        &self,
        prepared: &Prepared,
        interactor: &mut dyn Interactor,
        state_path: Option<&Path>,
        out_dir: &Path,
    ) -> anyhow::Result<RunReport> {
        let settings = SessionSettings::from_config(&self.config.proposals, &self.config.artifacts);
        let mut session = match state_path.filter(|p| p.exists()) {
            Some(path) => {
                let state = SessionState::load(path)?;
                Session::resume(&prepared.workflow, &prepared.proposals, settings, state)?
            }
            None => Session::new(&prepared.workflow, &prepared.proposals, settings),
        };
        if let Some(path) = state_path {
            session = session.on_checkpoint(move |state| state.save(path));
        }

        session.run(interactor)?;
        let answers = session.finish()?;

        let _publishing = PublishingGuard::enter(&self.publishing);

        let generator = ArtifactGenerator::from_config(&self.config);
        let codebase = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let artifacts = generator.generate(&GenerationInput {
            workflow: &prepared.workflow,
            answers: &answers,
            signals: &prepared.report.signals,
            degradations: &prepared.report.degradations,
            codebase: &codebase,
            generated_at: Utc::now(),
        })?;

        let store = FsArtifactStore::new(out_dir);
        let paths = generator
            .publish(&store, &artifacts)
            .with_context(|| format!("Failed to publish artifacts to {}", out_dir.display()))?;

        if let Some(path) = state_path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(error = %e, path = ?path, "Failed to remove session state"),
            }
        }

        Ok(RunReport { artifacts, paths })
    }
}

/// Holds the publishing flag for as long as it lives.
struct PublishingGuard<'a>(&'a AtomicBool);

impl<'a> PublishingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for PublishingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Exit code for an error returned by the pipeline.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<SessionError>() {
        Some(SessionError::Interrupted) => exit::INTERRUPTED,
        _ => exit::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AutoInteractor, Prompt, Reply, ScriptedInteractor};

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_detectors_for_reverse_engineering() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(dir.path(), Config::default()).unwrap();
        let workflow = pipeline.resolve("fdd-reverse-engineering").unwrap();

        let detectors = pipeline.detectors_for(&workflow);
        assert!(detectors.contains(&"features".to_string()));
        assert!(detectors.contains(&"npm".to_string()));
        let mut sorted = detectors.clone();
        sorted.sort();
        assert_eq!(detectors, sorted);
    }

    #[test]
    fn test_disabled_detectors_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.detection.enabled.retain(|d| d != "docker");
        let pipeline = Pipeline::new(dir.path(), config).unwrap();
        let workflow = pipeline.resolve("fdd-reverse-engineering").unwrap();

        assert!(!pipeline.detectors_for(&workflow).contains(&"docker".to_string()));
    }

    #[test]
    fn test_unknown_workflow_fails_before_detection() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(dir.path(), Config::default()).unwrap();
        let err = pipeline.prepare("nope").unwrap_err();
        assert!(matches!(err.downcast_ref::<WorkflowError>(), Some(WorkflowError::UnknownWorkflow(_))));
    }

    #[test]
    fn test_interrupted_run_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "package.json", r#"{"name": "shop", "dependencies": {"express": "^4"}}"#);
        let pipeline = Pipeline::new(dir.path(), Config::default()).unwrap();
        let prepared = pipeline.prepare("fdd-base").unwrap();

        let state_path = dir.path().join("state.json");
        let out = dir.path().join("out");
        let mut interactor = ScriptedInteractor::new([Reply::Manual("Shop".to_string())]);
        let err = pipeline.run(&prepared, &mut interactor, Some(&state_path), &out).unwrap_err();

        assert_eq!(exit_code_for(&err), exit::INTERRUPTED);
        let state = SessionState::load(&state_path).unwrap();
        assert_eq!(state.answers.len(), 1);
        assert!(!out.exists());
    }

    /// Answers every prompt and records whether publishing was flagged meanwhile.
    struct Watching {
        inner: AutoInteractor,
        flag: Arc<AtomicBool>,
        saw_publishing: bool,
    }

    impl Interactor for Watching {
        fn ask(&mut self, prompt: &Prompt) -> Result<Reply, SessionError> {
            self.saw_publishing |= self.flag.load(Ordering::SeqCst);
            self.inner.ask(prompt)
        }
    }

    #[test]
    fn test_publishing_flag_covers_only_publish() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(dir.path(), Config::default()).unwrap();
        let prepared = pipeline.prepare("fdd-base").unwrap();
        let answers = prepared
            .workflow
            .questions()
            .map(|step| (step.id.clone(), "Coffee".to_string()))
            .collect();

        // a regular file where the output directory should be makes publishing fail
        let out = dir.path().join("out");
        std::fs::write(&out, "").unwrap();

        let flag = pipeline.publishing();
        let mut interactor = Watching {
            inner: AutoInteractor::new().with_answers(answers),
            flag: Arc::clone(&flag),
            saw_publishing: false,
        };
        let err = pipeline.run(&prepared, &mut interactor, None, &out).unwrap_err();

        assert_eq!(exit_code_for(&err), exit::ERROR);
        assert!(!interactor.saw_publishing);
        assert!(!flag.load(Ordering::SeqCst));
    }
}
