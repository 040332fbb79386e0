//! Concurrent signal extraction.
//!
//! Fans every requested detector out onto the blocking pool, bounds each one
//! by a time budget, and joins the results into one canonically sorted list.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::{Codebase, DetectorParams, DetectorRegistry, LocalCodebase, Signal};
use crate::core::{Config, DegradationLog, DegradationReason};

/// Aggregated output of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// All signals, in canonical order
    pub signals: Vec<Signal>,

    /// Detectors that produced reduced output, sorted by detector name
    pub degradations: DegradationLog,
}

impl DetectionReport {
    /// Signals of one kind, in canonical order.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Signal> + 'a {
        self.signals.iter().filter(move |s| s.kind == kind)
    }

    /// Signals emitted by one detector.
    pub fn from_detector<'a>(&'a self, detector: &'a str) -> impl Iterator<Item = &'a Signal> + 'a {
        self.signals.iter().filter(move |s| s.detector == detector)
    }

    /// Check if no signal was produced.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Outcome of a single detector run.
enum Outcome {
    Signals(Vec<Signal>),
    Degraded(DegradationReason),
}

/// Runs detectors against a codebase.
///
/// Cheap to clone and safe to share: detection for one session can run while
/// another session is waiting on a human.
#[derive(Clone)]
pub struct SignalExtractor {
    codebase: Arc<dyn Codebase>,
    registry: Arc<DetectorRegistry>,
    params: BTreeMap<String, DetectorParams>,
    budget: Duration,
    max_concurrency: usize,
}

impl SignalExtractor {
    /// Default time budget for one detector.
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(5);

    /// Create an extractor with default limits.
    pub fn new(codebase: Arc<dyn Codebase>, registry: Arc<DetectorRegistry>) -> Self {
        Self {
            codebase,
            registry,
            params: BTreeMap::new(),
            budget: Self::DEFAULT_BUDGET,
            max_concurrency: num_cpus::get().max(1),
        }
    }

    /// Create an extractor over a local directory using configured limits and params.
    pub fn from_config(root: impl Into<std::path::PathBuf>, config: &Config) -> Self {
        let codebase = LocalCodebase::from_config(root, &config.detection);
        Self::new(Arc::new(codebase), Arc::new(DetectorRegistry::builtin()))
            .with_budget(Duration::from_millis(config.detection.timeout_ms))
            .with_params(config.detection.params.clone())
    }

    /// Set the per-detector time budget.
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Set detector parameters, keyed by detector name.
    #[must_use]
    pub fn with_params(mut self, params: BTreeMap<String, DetectorParams>) -> Self {
        self.params = params;
        self
    }

    /// Limit how many detectors run at once.
    #[must_use]
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// The codebase being analysed.
    pub fn codebase(&self) -> &Arc<dyn Codebase> {
        &self.codebase
    }

    /// Run the named detectors and merge their signals.
    ///
    /// Never fails: timeouts, parse errors, panics and unknown names are
    /// recorded as degradations and contribute zero signals.
    pub async fn extract(&self, names: &[String]) -> DetectionReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let mut requested: Vec<&String> = names.iter().collect();
        requested.sort();
        requested.dedup();

        let runs = requested.into_iter().map(|name| {
            let semaphore = Arc::clone(&semaphore);
            async move { (name.clone(), self.run_one(name, semaphore).await) }
        });
        let outcomes = futures::future::join_all(runs).await;

        let mut report = DetectionReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Outcome::Signals(signals) => {
                    tracing::debug!(detector = name.as_str(), count = signals.len(), "Detector finished");
                    report.signals.extend(signals.into_iter().map(|mut signal| {
                        signal.detector.clone_from(&name);
                        signal.confidence = signal.confidence.clamp(0.0, 1.0);
                        signal
                    }));
                }
                Outcome::Degraded(reason) => {
                    tracing::warn!(detector = name.as_str(), reason = %reason, "Detector degraded");
                    report.degradations.record(name, reason);
                }
            }
        }

        report.signals.sort_by(Signal::canonical_cmp);
        report.degradations.normalize();
        report
    }

    /// Run [`extract`](Self::extract) on a fresh current-thread runtime.
    ///
    /// Detectors still running past their budget are abandoned with the
    /// runtime, so the call returns once every budget has elapsed.
    pub fn extract_blocking(&self, names: &[String]) -> anyhow::Result<DetectionReport> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let report = runtime.block_on(self.extract(names));
        runtime.shutdown_background();
        Ok(report)
    }

    async fn run_one(&self, name: &str, semaphore: Arc<Semaphore>) -> Outcome {
        let Some(detector) = self.registry.get(name) else {
            return Outcome::Degraded(DegradationReason::UnknownDetector);
        };

        let Ok(permit) = semaphore.acquire_owned().await else {
            return Outcome::Degraded(DegradationReason::Crashed);
        };

        let codebase = Arc::clone(&self.codebase);
        let params = self.params.get(name).cloned().unwrap_or_default();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            detector.detect(codebase.as_ref(), &params)
        });

        // A timed out detector keeps its thread until it returns; it only reads.
        match tokio::time::timeout(self.budget, handle).await {
            Err(_) => Outcome::Degraded(DegradationReason::TimedOut {
                budget_ms: u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX),
            }),
            Ok(Err(join_error)) => {
                tracing::error!(detector = name, error = %join_error, "Detector panicked");
                Outcome::Degraded(DegradationReason::Crashed)
            }
            Ok(Ok(Err(e))) => Outcome::Degraded(e.into_reason()),
            Ok(Ok(Ok(signals))) => Outcome::Signals(signals),
        }
    }
}

impl std::fmt::Debug for SignalExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalExtractor")
            .field("root", &self.codebase.root())
            .field("registry", &self.registry)
            .field("budget", &self.budget)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{kinds, Detector, DetectorError, MemoryCodebase};

    struct SlowDetector;

    impl Detector for SlowDetector {
        fn name(&self) -> &str {
            "slow"
        }

        fn detect(
            &self,
            _codebase: &dyn Codebase,
            _params: &DetectorParams,
        ) -> Result<Vec<Signal>, DetectorError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(vec![Signal::new("slow", kinds::TECH_STACK, "Late", 1.0)])
        }
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn name(&self) -> &str {
            "panics"
        }

        fn detect(
            &self,
            _codebase: &dyn Codebase,
            _params: &DetectorParams,
        ) -> Result<Vec<Signal>, DetectorError> {
            panic!("detector bug");
        }
    }

    struct OverconfidentDetector;

    impl Detector for OverconfidentDetector {
        fn name(&self) -> &str {
            "loud"
        }

        fn detect(
            &self,
            _codebase: &dyn Codebase,
            _params: &DetectorParams,
        ) -> Result<Vec<Signal>, DetectorError> {
            Ok(vec![Signal::new("someone-else", kinds::TESTING, "Jest", 1.7)])
        }
    }

    fn express_codebase() -> MemoryCodebase {
        MemoryCodebase::new()
            .with_file(
                "package.json",
                r#"{"name": "shop", "dependencies": {"express": "^4.18.0"}, "devDependencies": {"jest": "^29"}}"#,
            )
            .with_file("Dockerfile", "FROM node:20\n")
            .with_dir("src/features/cart")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_extract_is_sorted_and_tagged() {
        let extractor = SignalExtractor::new(
            Arc::new(express_codebase()),
            Arc::new(DetectorRegistry::builtin()),
        );
        let report = extractor.extract(&names(&["npm", "docker", "features"])).await;

        assert!(report.degradations.is_empty());
        let mut sorted = report.signals.clone();
        sorted.sort_by(Signal::canonical_cmp);
        assert_eq!(report.signals, sorted);
        assert_eq!(report.signals[0].detector, "docker");

        let stack: Vec<_> = report.of_kind(kinds::TECH_STACK).collect();
        assert_eq!(stack[0].value(), Some("Node/Express"));
        assert!((stack[0].confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(report.from_detector("features").count(), 2);
    }

    #[tokio::test]
    async fn test_extract_is_deterministic() {
        let extractor = SignalExtractor::new(
            Arc::new(express_codebase()),
            Arc::new(DetectorRegistry::builtin()),
        );
        let all = names(&DetectorRegistry::builtin().names());

        let first = extractor.extract(&all).await;
        let second = extractor.max_concurrency(1).extract(&all).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failures_degrade_without_aborting() {
        let mut registry = DetectorRegistry::builtin();
        registry.register(Arc::new(SlowDetector));
        registry.register(Arc::new(PanickingDetector));

        let codebase = express_codebase().with_file("go.mod", "require (\n");
        let extractor = SignalExtractor::new(Arc::new(codebase), Arc::new(registry))
            .with_budget(Duration::from_millis(50));

        let report = extractor.extract(&names(&["slow", "panics", "go", "npm", "nope"])).await;

        let sources: Vec<_> =
            report.degradations.entries().iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["go", "nope", "panics", "slow"]);

        let reasons: Vec<_> = report.degradations.entries().iter().map(|d| &d.reason).collect();
        assert!(matches!(reasons[0], DegradationReason::ParseFailed { .. }));
        assert_eq!(reasons[1], &DegradationReason::UnknownDetector);
        assert_eq!(reasons[2], &DegradationReason::Crashed);
        assert_eq!(reasons[3], &DegradationReason::TimedOut { budget_ms: 50 });

        assert!(report.signals.iter().all(|s| s.detector == "npm"));
        assert!(!report.is_empty());
    }

    #[tokio::test]
    async fn test_signals_are_retagged_and_clamped() {
        let mut registry = DetectorRegistry::new();
        registry.register(Arc::new(OverconfidentDetector));
        let extractor = SignalExtractor::new(Arc::new(MemoryCodebase::new()), Arc::new(registry));

        let report = extractor.extract(&names(&["loud"])).await;
        assert_eq!(report.signals.len(), 1);
        assert_eq!(report.signals[0].detector, "loud");
        assert!((report.signals[0].confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_extract_blocking() {
        let extractor = SignalExtractor::new(
            Arc::new(express_codebase()),
            Arc::new(DetectorRegistry::builtin()),
        );
        let report = extractor.extract_blocking(&names(&["npm"])).unwrap();
        assert!(report.signals.iter().any(|s| s.value() == Some("Jest")));
    }

    struct StuckDetector;

    impl Detector for StuckDetector {
        fn name(&self) -> &str {
            "stuck"
        }

        fn detect(
            &self,
            _codebase: &dyn Codebase,
            _params: &DetectorParams,
        ) -> Result<Vec<Signal>, DetectorError> {
            std::thread::sleep(Duration::from_secs(3));
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_extract_blocking_returns_within_budget() {
        let mut registry = DetectorRegistry::builtin();
        registry.register(Arc::new(StuckDetector));
        let extractor = SignalExtractor::new(Arc::new(express_codebase()), Arc::new(registry))
            .with_budget(Duration::from_millis(100))
            .max_concurrency(4);

        let started = std::time::Instant::now();
        let report = extractor.extract_blocking(&names(&["stuck", "npm"])).unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
        assert_eq!(
            report.degradations.entries()[0].reason,
            DegradationReason::TimedOut { budget_ms: 100 }
        );
        assert!(report.signals.iter().all(|s| s.detector == "npm"));
    }
}
