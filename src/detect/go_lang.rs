//! Go project detector.
//!
//! Reads go.mod to extract the module name and required frameworks.

use std::path::Path;

use super::{kinds, lookup, read_optional, Codebase, Detector, DetectorError, DetectorParams, Signal};

const FRAMEWORKS: &[(&str, &str, f64)] = &[
    ("github.com/gin-gonic/gin", "Go/Gin", 0.9),
    ("github.com/labstack/echo/v4", "Go/Echo", 0.9),
    ("github.com/gofiber/fiber/v2", "Go/Fiber", 0.9),
    ("github.com/go-chi/chi/v5", "Go/Chi", 0.85),
    ("github.com/gorilla/mux", "Go/Gorilla", 0.8),
];

/// Detector for Go modules.
pub struct GoDetector;

impl Detector for GoDetector {
    fn name(&self) -> &str {
        "go"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        _params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        let manifest = Path::new("go.mod");
        let Some(content) = read_optional(codebase, manifest)? else {
            return Ok(Vec::new());
        };

        let module = parse_go_mod(&content).map_err(|e| DetectorError::parse(manifest, e))?;
        let mut signals = Vec::new();

        let short_name = module.name.rsplit('/').next().unwrap_or(&module.name);
        signals.push(self.signal(kinds::PROJECT_NAME, short_name, 0.7, &module.name));

        let mut has_framework = false;
        for req in &module.requires {
            if let Some((value, confidence)) = lookup(FRAMEWORKS, req) {
                has_framework = true;
                signals.push(self.signal(kinds::TECH_STACK, value, confidence, req));
            }
        }
        if !has_framework {
            signals.push(self.signal(kinds::TECH_STACK, "Go", 0.6, "go.mod"));
        }

        signals.push(self.signal(kinds::TESTING, "go test", 0.5, "go.mod"));
        if module.requires.iter().any(|r| r == "github.com/stretchr/testify") {
            signals.push(self.signal(
                kinds::TESTING,
                "testify",
                0.7,
                "github.com/stretchr/testify",
            ));
        }

        Ok(signals)
    }
}

impl GoDetector {
    fn signal(&self, kind: &str, value: &str, confidence: f64, evidence: &str) -> Signal {
        Signal::new(self.name(), kind, value, confidence)
            .with("path", "go.mod")
            .with("evidence", evidence)
    }
}

/// The parts of go.mod we care about.
#[derive(Debug, Default, PartialEq, Eq)]
struct GoModule {
    name: String,
    requires: Vec<String>,
}

/// Parse go.mod content.
fn parse_go_mod(content: &str) -> Result<GoModule, String> {
    let mut module = GoModule::default();
    let mut in_require_block = false;

    for line in content.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if in_require_block {
            if line == ")" {
                in_require_block = false;
            } else if let Some(path) = line.split_whitespace().next() {
                module.requires.push(path.to_string());
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("module ") {
            module.name = rest.trim().trim_matches('"').to_string();
        } else if line == "require (" || line == "require(" {
            in_require_block = true;
        } else if let Some(rest) = line.strip_prefix("require ") {
            if let Some(path) = rest.split_whitespace().next() {
                module.requires.push(path.to_string());
            }
        }
    }

    if in_require_block {
        return Err("unterminated require block".to_string());
    }
    if module.name.is_empty() {
        return Err("missing module directive".to_string());
    }

    module.requires.sort();
    module.requires.dedup();
    Ok(module)
}
