//! Python project detector.
//!
//! Reads pyproject.toml (PEP 621 or Poetry layout) and requirements.txt.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use super::{kinds, lookup, read_optional, Codebase, Detector, DetectorError, DetectorParams, Signal};

const FRAMEWORKS: &[(&str, &str, f64)] = &[
    ("django", "Python/Django", 0.9),
    ("flask", "Python/Flask", 0.9),
    ("fastapi", "Python/FastAPI", 0.9),
    ("starlette", "Python/Starlette", 0.8),
    ("tornado", "Python/Tornado", 0.8),
];

const TEST_TOOLS: &[(&str, &str, f64)] = &[("pytest", "pytest", 0.8), ("nose2", "nose2", 0.7)];

const LINT_TOOLS: &[(&str, &str, f64)] = &[
    ("ruff", "Ruff", 0.7),
    ("flake8", "Flake8", 0.7),
    ("pylint", "Pylint", 0.7),
    ("black", "Black", 0.6),
    ("mypy", "mypy", 0.5),
];

/// Detector for Python projects.
pub struct PythonDetector;

impl Detector for PythonDetector {
    fn name(&self) -> &str {
        "python"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        _params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        let pyproject_path = Path::new("pyproject.toml");
        let requirements_path = Path::new("requirements.txt");

        let pyproject = read_optional(codebase, pyproject_path)?;
        let requirements = read_optional(codebase, requirements_path)?;
        if pyproject.is_none() && requirements.is_none() {
            return Ok(Vec::new());
        }

        let primary = if pyproject.is_some() { "pyproject.toml" } else { "requirements.txt" };
        let mut signals = Vec::new();
        // (dependency name, file it was found in)
        let mut deps: BTreeSet<(String, &str)> = BTreeSet::new();

        if let Some(content) = pyproject {
            let project: PyProject =
                toml::from_str(&content).map_err(|e| DetectorError::parse(pyproject_path, e))?;

            if let Some(name) = project.name() {
                signals.push(
                    Signal::new(self.name(), kinds::PROJECT_NAME, name, 0.8)
                        .with("path", "pyproject.toml")
                        .with("evidence", "project.name"),
                );
            }
            for dep in project.dependency_names() {
                deps.insert((dep, "pyproject.toml"));
            }
        }

        if let Some(content) = requirements {
            for dep in parse_requirements(&content) {
                deps.insert((dep, "requirements.txt"));
            }
        }

        let mut has_framework = false;
        for (dep, path) in &deps {
            for (table, kind) in [
                (FRAMEWORKS, kinds::TECH_STACK),
                (TEST_TOOLS, kinds::TESTING),
                (LINT_TOOLS, kinds::LINTING),
            ] {
                if let Some((value, confidence)) = lookup(table, dep) {
                    has_framework |= kind == kinds::TECH_STACK;
                    signals.push(
                        Signal::new(self.name(), kind, value, confidence)
                            .with("path", *path)
                            .with("evidence", dep.as_str()),
                    );
                }
            }
        }

        if !has_framework {
            signals.push(
                Signal::new(self.name(), kinds::TECH_STACK, "Python", 0.6)
                    .with("path", primary)
                    .with("evidence", "python manifest"),
            );
        }

        Ok(signals)
    }
}

/// pyproject.toml structure (only the parts we need).
#[derive(Debug, Default, Deserialize)]
struct PyProject {
    project: Option<Pep621Project>,
    tool: Option<Tool>,
}

#[derive(Debug, Default, Deserialize)]
struct Pep621Project {
    name: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "optional-dependencies")]
    optional_dependencies: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
struct Tool {
    poetry: Option<Poetry>,
}

#[derive(Debug, Default, Deserialize)]
struct Poetry {
    name: Option<String>,
    #[serde(default)]
    dependencies: toml::Table,
    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: toml::Table,
    #[serde(default)]
    group: toml::Table,
}

impl PyProject {
    fn name(&self) -> Option<&str> {
        self.project
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .or_else(|| self.tool.as_ref()?.poetry.as_ref()?.name.as_deref())
    }

    fn dependency_names(&self) -> Vec<String> {
        let mut names = Vec::new();

        if let Some(project) = &self.project {
            names.extend(project.dependencies.iter().map(|d| normalize_requirement(d)));
            for extras in project.optional_dependencies.values() {
                if let Some(list) = extras.as_array() {
                    names.extend(list.iter().filter_map(|v| v.as_str()).map(normalize_requirement));
                }
            }
        }

        if let Some(poetry) = self.tool.as_ref().and_then(|t| t.poetry.as_ref()) {
            names.extend(poetry.dependencies.keys().map(|k| k.to_lowercase()));
            names.extend(poetry.dev_dependencies.keys().map(|k| k.to_lowercase()));
            // [tool.poetry.group.<name>.dependencies]
            for group in poetry.group.values() {
                if let Some(deps) = group.get("dependencies").and_then(|d| d.as_table()) {
                    names.extend(deps.keys().map(|k| k.to_lowercase()));
                }
            }
        }

        names.retain(|n| !n.is_empty() && n != "python");
        names
    }
}

/// Reduce a requirement specifier such as `Django>=4.2; python_version>"3.8"`
/// to its lowercase distribution name.
fn normalize_requirement(spec: &str) -> String {
    spec.split(|c: char| matches!(c, '<' | '>' | '=' | '!' | '~' | '[' | ';' | ' ' | '@'))
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Parse requirements.txt, skipping comments and pip options.
fn parse_requirements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty() && !l.starts_with('-'))
        .map(normalize_requirement)
        .filter(|n| !n.is_empty())
        .collect()
}
