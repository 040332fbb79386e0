//! Cargo/Rust project detector.
//!
//! Reads Cargo.toml to find the package name and web framework.

use std::path::Path;

use serde::Deserialize;

use super::{kinds, lookup, read_optional, Codebase, Detector, DetectorError, DetectorParams, Signal};

const FRAMEWORKS: &[(&str, &str, f64)] = &[
    ("actix-web", "Rust/Actix Web", 0.9),
    ("axum", "Rust/Axum", 0.9),
    ("rocket", "Rust/Rocket", 0.9),
    ("warp", "Rust/Warp", 0.85),
    ("poem", "Rust/Poem", 0.85),
    ("tauri", "Rust/Tauri", 0.8),
];

const TEST_TOOLS: &[(&str, &str, f64)] = &[
    ("rstest", "rstest", 0.75),
    ("proptest", "proptest", 0.6),
    ("insta", "insta", 0.6),
];

/// Detector for Rust/Cargo projects.
pub struct CargoDetector;

impl Detector for CargoDetector {
    fn name(&self) -> &str {
        "cargo"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        _params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        let manifest = Path::new("Cargo.toml");
        let Some(content) = read_optional(codebase, manifest)? else {
            return Ok(Vec::new());
        };

        let cargo: CargoToml =
            toml::from_str(&content).map_err(|e| DetectorError::parse(manifest, e))?;

        let mut signals = Vec::new();

        if let Some(name) = cargo.package.as_ref().and_then(|p| p.name.as_deref()) {
            signals.push(self.signal(kinds::PROJECT_NAME, name, 0.8, "package.name"));
        }

        let mut deps: Vec<&str> = cargo
            .dependencies
            .keys()
            .chain(cargo.workspace.iter().flat_map(|w| w.dependencies.keys()))
            .map(String::as_str)
            .collect();
        deps.sort_unstable();
        deps.dedup();

        let mut has_framework = false;
        for dep in &deps {
            if let Some((value, confidence)) = lookup(FRAMEWORKS, dep) {
                has_framework = true;
                signals.push(self.signal(kinds::TECH_STACK, value, confidence, dep));
            }
        }
        if !has_framework {
            signals.push(self.signal(kinds::TECH_STACK, "Rust", 0.6, "Cargo.toml"));
        }

        signals.push(self.signal(kinds::TESTING, "cargo test", 0.5, "Cargo.toml"));
        for dep in cargo.dev_dependencies.keys() {
            if let Some((value, confidence)) = lookup(TEST_TOOLS, dep) {
                signals.push(self.signal(kinds::TESTING, value, confidence, dep));
            }
        }

        Ok(signals)
    }
}

impl CargoDetector {
    fn signal(&self, kind: &str, value: &str, confidence: f64, evidence: &str) -> Signal {
        Signal::new(self.name(), kind, value, confidence)
            .with("path", "Cargo.toml")
            .with("evidence", evidence)
    }
}

/// Cargo.toml structure (only the parts we need).
#[derive(Debug, Deserialize)]
struct CargoToml {
    package: Option<Package>,

    #[serde(default)]
    dependencies: toml::Table,

    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: toml::Table,

    workspace: Option<Workspace>,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Workspace {
    #[serde(default)]
    dependencies: toml::Table,
}
