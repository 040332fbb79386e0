//! Workflow parser.
//!
//! Parses YAML workflow files into [`WorkflowDefinition`]s and validates them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{StepChange, StepKind, WorkflowDefinition, WorkflowError};

/// Parse a workflow from a file.
pub fn parse_workflow(path: &Path) -> Result<WorkflowDefinition, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    parse_workflow_source(&content, &path.display().to_string())
}

/// Parse a workflow from a string.
pub fn parse_workflow_str(content: &str) -> Result<WorkflowDefinition, WorkflowError> {
    parse_workflow_source(content, "<inline>")
}

fn parse_workflow_source(
    content: &str,
    origin: &str,
) -> Result<WorkflowDefinition, WorkflowError> {
    let mut definition: WorkflowDefinition = serde_yaml::from_str(content).map_err(|e| {
        WorkflowError::Parse { path: origin.to_string(), message: e.to_string() }
    })?;
    // Actions are generation steps whether or not the file says so.
    for action in &mut definition.actions {
        action.kind = StepKind::Generation;
    }
    validate_definition(&definition)?;
    Ok(definition)
}

/// Validate a definition for structural errors that need no parent to detect.
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.name.trim().is_empty() {
        return Err(WorkflowError::invalid("<unnamed>", "name cannot be empty"));
    }

    if def.parent.as_deref() == Some(def.name.as_str()) {
        return Err(WorkflowError::Cycle { chain: vec![def.name.clone(), def.name.clone()] });
    }

    if let Some(threshold) = def.threshold {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(WorkflowError::invalid(&def.name, "threshold must be between 0 and 100"));
        }
    }

    if def.is_extension() {
        if !def.steps.is_empty() {
            return Err(WorkflowError::invalid(
                &def.name,
                "an extension adds steps through `changes` and `actions`, not `steps`",
            ));
        }
    } else {
        if def.steps.is_empty() {
            return Err(WorkflowError::invalid(&def.name, "a root workflow must have at least one step"));
        }
        if !def.changes.is_empty() {
            return Err(WorkflowError::invalid(&def.name, "a root workflow has no parent to change"));
        }
    }

    let mut seen = BTreeSet::new();
    for id in def.introduced_ids() {
        if id.trim().is_empty() {
            return Err(WorkflowError::invalid(&def.name, "step id cannot be empty"));
        }
        if !seen.insert(id) {
            return Err(WorkflowError::invalid(&def.name, format!("duplicate step id '{id}'")));
        }
    }

    let inserted = def.changes.iter().filter_map(|c| match c {
        StepChange::Insert { step, .. } => Some(step),
        _ => None,
    });
    for step in def.steps.iter().chain(inserted).chain(&def.actions) {
        match step.kind {
            StepKind::Question if step.prompt.trim().is_empty() => {
                return Err(WorkflowError::invalid(
                    &def.name,
                    format!("question step '{}' has no prompt", step.id),
                ));
            }
            StepKind::Generation if step.artifact.is_none() => {
                return Err(WorkflowError::invalid(
                    &def.name,
                    format!("generation step '{}' has no artifact", step.id),
                ));
            }
            _ => {}
        }
        if let Some(artifact) = &step.artifact {
            if artifact.output.trim().is_empty() {
                return Err(WorkflowError::invalid(
                    &def.name,
                    format!("generation step '{}' has no output path", step.id),
                ));
            }
            if artifact.per_feature && !artifact.output.contains("{slug}") {
                return Err(WorkflowError::invalid(
                    &def.name,
                    format!("per-feature step '{}' must use {{slug}} in its output path", step.id),
                ));
            }
        }
    }

    Ok(())
}

/// Workflow directories searched below a project root.
pub fn workflow_dirs(root: &Path) -> Vec<PathBuf> {
    vec![root.join(".fddflow").join("workflows"), root.join("workflows")]
}

/// Discover workflow files in a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn scan_workflow_dir(dir: &Path) -> Vec<WorkflowDefinition> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "yaml" || e == "yml"))
        .collect();
    paths.sort();

    let mut definitions = Vec::new();
    for path in paths {
        match parse_workflow(&path) {
            Ok(def) => definitions.push(def),
            Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to parse workflow"),
        }
    }
    definitions
}
