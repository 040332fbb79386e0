//! NPM/Yarn/PNPM/Bun package.json detector.
//!
//! Reads the root package.json and turns its dependencies into stack,
//! testing and linting signals.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{kinds, lookup, read_optional, Codebase, Detector, DetectorError, DetectorParams, Signal};

/// Web frameworks recognised in package.json dependencies.
const FRAMEWORKS: &[(&str, &str, f64)] = &[
    ("express", "Node/Express", 0.9),
    ("fastify", "Node/Fastify", 0.9),
    ("@nestjs/core", "Node/NestJS", 0.9),
    ("koa", "Node/Koa", 0.85),
    ("next", "Node/Next.js", 0.9),
    ("nuxt", "Node/Nuxt", 0.9),
    ("@angular/core", "Node/Angular", 0.8),
    ("react", "Node/React", 0.6),
    ("vue", "Node/Vue", 0.6),
    ("svelte", "Node/Svelte", 0.6),
];

const TEST_TOOLS: &[(&str, &str, f64)] = &[
    ("jest", "Jest", 0.8),
    ("vitest", "Vitest", 0.8),
    ("mocha", "Mocha", 0.8),
    ("@playwright/test", "Playwright", 0.7),
    ("cypress", "Cypress", 0.7),
];

const LINT_TOOLS: &[(&str, &str, f64)] = &[
    ("eslint", "ESLint", 0.7),
    ("prettier", "Prettier", 0.6),
    ("@biomejs/biome", "Biome", 0.7),
];

/// Detector for package.json manifests.
pub struct NpmDetector;

impl Detector for NpmDetector {
    fn name(&self) -> &str {
        "npm"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        _params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        let manifest = Path::new("package.json");
        let Some(content) = read_optional(codebase, manifest)? else {
            return Ok(Vec::new());
        };

        let package: PackageJson =
            serde_json::from_str(&content).map_err(|e| DetectorError::parse(manifest, e))?;

        let package_manager = detect_package_manager(codebase);
        let mut signals = Vec::new();

        if let Some(name) = package.name.as_deref().filter(|n| !n.is_empty()) {
            signals.push(self.signal(kinds::PROJECT_NAME, name, 0.8, "name"));
        }

        let mut has_framework = false;
        for dep in package.all_dependencies() {
            if let Some((value, confidence)) = lookup(FRAMEWORKS, dep) {
                has_framework = true;
                signals.push(self.signal(kinds::TECH_STACK, value, confidence, dep));
            }
            if let Some((value, confidence)) = lookup(TEST_TOOLS, dep) {
                signals.push(self.signal(kinds::TESTING, value, confidence, dep));
            }
            if let Some((value, confidence)) = lookup(LINT_TOOLS, dep) {
                signals.push(self.signal(kinds::LINTING, value, confidence, dep));
            }
        }

        if !has_framework {
            signals.push(self.signal(kinds::TECH_STACK, "Node.js", 0.6, "package.json"));
        }

        for signal in &mut signals {
            signal.payload.insert("package_manager".to_string(), package_manager.to_string());
        }

        tracing::debug!(count = signals.len(), "npm detector finished");
        Ok(signals)
    }
}

impl NpmDetector {
    fn signal(&self, kind: &str, value: &str, confidence: f64, evidence: &str) -> Signal {
        Signal::new(self.name(), kind, value, confidence)
            .with("path", "package.json")
            .with("evidence", evidence)
    }
}

/// Parsed package.json structure.
#[derive(Debug, Default, Deserialize)]
pub struct PackageJson {
    /// Package name
    pub name: Option<String>,

    /// Dependencies (for detecting project type)
    #[serde(default)]
    pub dependencies: HashMap<String, serde_json::Value>,

    /// Dev dependencies
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: HashMap<String, serde_json::Value>,
}

impl PackageJson {
    /// Dependency names from both tables, sorted and de-duplicated.
    pub fn all_dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .map(String::as_str)
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

/// Detect which package manager is being used.
pub fn detect_package_manager(codebase: &dyn Codebase) -> &'static str {
    let has = |name: &str| codebase.list_matching(&[name]).is_ok_and(|found| !found.is_empty());
    if has("bun.lockb") {
        "bun"
    } else if has("pnpm-lock.yaml") {
        "pnpm"
    } else if has("yarn.lock") {
        "yarn"
    } else {
        "npm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::MemoryCodebase;

    fn run(codebase: &MemoryCodebase) -> Vec<Signal> {
        NpmDetector.detect(codebase, &DetectorParams::new()).unwrap()
    }

    #[test]
    fn test_express_dependency() {
        let codebase = MemoryCodebase::new().with_file(
            "package.json",
            r#"{
                "name": "shop-api",
                "dependencies": { "express": "^4.18.0" },
                "devDependencies": { "jest": "^29.0.0", "eslint": "^8.0.0" }
            }"#,
        );

        let signals = run(&codebase);
        let stack: Vec<_> = signals.iter().filter(|s| s.kind == kinds::TECH_STACK).collect();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].value(), Some("Node/Express"));
        assert!((stack[0].confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(stack[0].get("evidence"), Some("express"));

        assert!(signals.iter().any(|s| s.kind == kinds::TESTING && s.value() == Some("Jest")));
        assert!(signals.iter().any(|s| s.kind == kinds::LINTING && s.value() == Some("ESLint")));
        assert!(signals
            .iter()
            .any(|s| s.kind == kinds::PROJECT_NAME && s.value() == Some("shop-api")));
    }

    #[test]
    fn test_plain_node_project() {
        let codebase = MemoryCodebase::new()
            .with_file("package.json", r#"{"name": "tool"}"#)
            .with_file("yarn.lock", "");

        let signals = run(&codebase);
        let stack = signals.iter().find(|s| s.kind == kinds::TECH_STACK).unwrap();
        assert_eq!(stack.value(), Some("Node.js"));
        assert_eq!(stack.get("package_manager"), Some("yarn"));
    }

    #[test]
    fn test_missing_manifest_yields_nothing() {
        assert!(run(&MemoryCodebase::new()).is_empty());
    }

    #[test]
    fn test_malformed_manifest_is_parse_error() {
        let codebase = MemoryCodebase::new().with_file("package.json", "{ not json");
        let err = NpmDetector.detect(&codebase, &DetectorParams::new()).unwrap_err();
        assert!(matches!(err, DetectorError::ManifestParse { .. }));
    }

    #[test]
    fn test_npm_detector_name() {
        assert_eq!(NpmDetector.name(), "npm");
    }
}
