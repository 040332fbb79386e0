//! Test configuration detector.
//!
//! Recognises test runners from their config files and test file layouts.

use super::{kinds, Codebase, Detector, DetectorError, DetectorParams, Signal};

/// `(patterns, value, confidence)`; the first matching file is reported.
pub(crate) type FileRule = (&'static [&'static str], &'static str, f64);

const RULES: &[FileRule] = &[
    (&["jest.config.{js,ts,cjs,mjs,json}"], "Jest", 0.85),
    (&["vitest.config.{js,ts,mjs,mts}", "vitest.workspace.{js,ts}"], "Vitest", 0.85),
    (&["playwright.config.{js,ts}"], "Playwright", 0.8),
    (&["cypress.config.{js,ts}", "cypress.json"], "Cypress", 0.8),
    (&["pytest.ini", "conftest.py", "tests/conftest.py"], "pytest", 0.85),
    (&["**/*_test.go"], "go test", 0.7),
    (&["tests/*.rs"], "cargo test", 0.6),
];

/// Detector for test tooling.
pub struct TestConfigDetector;

impl Detector for TestConfigDetector {
    fn name(&self) -> &str {
        "test-config"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        _params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        match_rules(self.name(), kinds::TESTING, RULES, codebase)
    }
}

/// Emit one signal per rule whose patterns match at least one path.
pub(crate) fn match_rules(
    detector: &str,
    kind: &str,
    rules: &[FileRule],
    codebase: &dyn Codebase,
) -> Result<Vec<Signal>, DetectorError> {
    let mut signals = Vec::new();
    for (patterns, value, confidence) in rules {
        let found = codebase.list_matching(patterns)?;
        if let Some(first) = found.first() {
            signals.push(
                Signal::new(detector, kind, *value, *confidence)
                    .with("path", first.display().to_string())
                    .with("matches", found.len().to_string()),
            );
        }
    }
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::MemoryCodebase;

    #[test]
    fn test_jest_and_go_tests() {
        let codebase = MemoryCodebase::new()
            .with_file("jest.config.ts", "export default {}")
            .with_file("pkg/orders/orders_test.go", "package orders")
            .with_file("pkg/orders/service_test.go", "package orders");

        let signals = TestConfigDetector.detect(&codebase, &DetectorParams::new()).unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].value(), Some("Jest"));
        assert_eq!(signals[1].value(), Some("go test"));
        assert_eq!(signals[1].get("matches"), Some("2"));
        assert!(signals.iter().all(|s| s.kind == kinds::TESTING));
    }

    #[test]
    fn test_nothing_found() {
        let codebase = MemoryCodebase::new().with_file("README.md", "# hi");
        let signals = TestConfigDetector.detect(&codebase, &DetectorParams::new()).unwrap();
        assert!(signals.is_empty());
    }
}
