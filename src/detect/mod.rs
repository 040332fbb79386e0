//! Codebase detectors that produce signals for answer proposals.
//!
//! Each detector inspects a read-only [`Codebase`] and reports what it found
//! as [`Signal`]s. Detectors are independent of each other: the
//! [`SignalExtractor`] runs them concurrently and merges their output into
//! one canonically ordered list.

mod cargo;
mod codebase;
mod docker;
mod error;
mod extractor;
mod features;
mod go_lang;
mod lint_config;
mod npm;
mod python;
mod test_config;

pub use cargo::CargoDetector;
pub use codebase::{read_optional, Codebase, LocalCodebase, MemoryCodebase};
pub use docker::DockerDetector;
pub use error::DetectorError;
pub use extractor::{DetectionReport, SignalExtractor};
pub use features::FeatureDetector;
pub use go_lang::GoDetector;
pub use lint_config::LintConfigDetector;
pub use npm::NpmDetector;
pub use python::PythonDetector;
pub use test_config::TestConfigDetector;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Parameters handed to a single detector, taken from configuration.
pub type DetectorParams = BTreeMap<String, String>;

/// Well-known signal kinds emitted by the built-in detectors.
pub mod kinds {
    /// Language and framework, e.g. `Node/Express`
    pub const TECH_STACK: &str = "tech-stack";
    /// Test framework or runner
    pub const TESTING: &str = "testing";
    /// Linter or formatter
    pub const LINTING: &str = "linting";
    /// Packaging or deployment target
    pub const DEPLOYMENT: &str = "deployment";
    /// Project or module name
    pub const PROJECT_NAME: &str = "project-name";
    /// One feature-like directory grouping
    pub const FEATURE: &str = "feature";
    /// Comma separated list of all discovered features
    pub const FEATURE_LIST: &str = "feature-list";
}

/// Payload key holding the candidate value of a signal.
pub const VALUE_KEY: &str = "value";

/// Trait for codebase detectors.
pub trait Detector: Send + Sync {
    /// Get the name of this detector.
    fn name(&self) -> &str;

    /// Inspect the codebase and return discovered signals.
    ///
    /// Missing files are not an error: a detector that finds nothing returns
    /// an empty list.
    fn detect(
        &self,
        codebase: &dyn Codebase,
        params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError>;
}

/// A single observation made by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Detector that produced the signal
    pub detector: String,

    /// What the signal describes (see [`kinds`])
    pub kind: String,

    /// Opaque key/value payload, `value` holds the candidate answer
    pub payload: BTreeMap<String, String>,

    /// Confidence in the range 0.0 - 1.0
    pub confidence: f64,
}

impl Signal {
    /// Create a new signal carrying a candidate value.
    pub fn new(
        detector: impl Into<String>,
        kind: impl Into<String>,
        value: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let mut payload = BTreeMap::new();
        payload.insert(VALUE_KEY.to_string(), value.into());
        Self { detector: detector.into(), kind: kind.into(), payload, confidence }
    }

    /// Add a payload entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Get a payload entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }

    /// The candidate value, if the signal carries one.
    pub fn value(&self) -> Option<&str> {
        self.get(VALUE_KEY)
    }

    /// Total order used to make extraction output deterministic.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.detector
            .cmp(&other.detector)
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.payload.cmp(&other.payload))
            .then_with(|| self.confidence.total_cmp(&other.confidence))
    }
}

/// Static table of named detectors.
#[derive(Clone, Default)]
pub struct DetectorRegistry {
    detectors: BTreeMap<String, Arc<dyn Detector>>,
}

impl DetectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in detector.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NpmDetector));
        registry.register(Arc::new(CargoDetector));
        registry.register(Arc::new(GoDetector));
        registry.register(Arc::new(PythonDetector));
        registry.register(Arc::new(DockerDetector));
        registry.register(Arc::new(TestConfigDetector));
        registry.register(Arc::new(LintConfigDetector));
        registry.register(Arc::new(FeatureDetector));
        registry
    }

    /// Register a detector, replacing any detector with the same name.
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        self.detectors.insert(detector.name().to_string(), detector);
    }

    /// Look up a detector by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors.get(name).cloned()
    }

    /// Names of all registered detectors, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.detectors.keys().map(String::as_str).collect()
    }

    /// Number of registered detectors.
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRegistry").field("detectors", &self.names()).finish()
    }
}

/// Look up a framework by dependency name in a `(dependency, value, confidence)` table.
pub(crate) fn lookup<'a>(
    table: &'a [(&'a str, &'a str, f64)],
    dependency: &str,
) -> Option<(&'a str, f64)> {
    table.iter().find(|(dep, _, _)| *dep == dependency).map(|(_, value, conf)| (*value, *conf))
}
