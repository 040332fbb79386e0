//! Lint and formatter configuration detector.

use super::test_config::{match_rules, FileRule};
use super::{kinds, Codebase, Detector, DetectorError, DetectorParams, Signal};

const RULES: &[FileRule] = &[
    (&[".eslintrc", ".eslintrc.{js,cjs,json,yml,yaml}", "eslint.config.{js,mjs,cjs,ts}"], "ESLint", 0.85),
    (&[".prettierrc", ".prettierrc.{js,json,yml,yaml}", "prettier.config.{js,cjs,mjs}"], "Prettier", 0.8),
    (&["biome.json", "biome.jsonc"], "Biome", 0.85),
    (&["rustfmt.toml", ".rustfmt.toml"], "rustfmt", 0.8),
    (&["clippy.toml", ".clippy.toml"], "Clippy", 0.8),
    (&[".golangci.yml", ".golangci.yaml", ".golangci.toml"], "golangci-lint", 0.85),
    (&["ruff.toml", ".ruff.toml"], "Ruff", 0.85),
    (&[".flake8"], "Flake8", 0.8),
    (&[".pylintrc", "pylintrc"], "Pylint", 0.8),
];

/// Detector for lint tooling.
pub struct LintConfigDetector;

impl Detector for LintConfigDetector {
    fn name(&self) -> &str {
        "lint-config"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        _params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        match_rules(self.name(), kinds::LINTING, RULES, codebase)
    }
}
