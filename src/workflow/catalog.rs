//! Named workflow definitions and extension chains.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{
    builtin, parse_workflow_str, resolve, scan_workflow_dir, workflow_dirs, ResolvedWorkflow,
    WorkflowDefinition, WorkflowError,
};

/// Where a catalog entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSource {
    /// Compiled into the binary
    Builtin,
    /// Loaded from a file in a workflow directory
    Directory(PathBuf),
    /// Added programmatically
    Inline,
}

/// All workflow definitions known to a run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    definitions: BTreeMap<String, (WorkflowDefinition, WorkflowSource)>,
}

impl WorkflowCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in definitions.
    pub fn builtin() -> Result<Self, WorkflowError> {
        let mut catalog = Self::new();
        for source in builtin::ALL {
            let definition = parse_workflow_str(source)?;
            catalog.definitions.insert(definition.name.clone(), (definition, WorkflowSource::Builtin));
        }
        Ok(catalog)
    }

    /// Built-ins plus definitions found below `root` and in `extra_dirs`.
    ///
    /// Later directories shadow earlier ones; everything shadows built-ins.
    pub fn discover(root: &Path, extra_dirs: &[PathBuf]) -> Result<Self, WorkflowError> {
        let mut catalog = Self::builtin()?;
        for dir in workflow_dirs(root).into_iter().chain(extra_dirs.iter().cloned()) {
            for definition in scan_workflow_dir(&dir) {
                tracing::debug!(workflow = definition.name.as_str(), dir = ?dir, "Loaded workflow");
                catalog
                    .definitions
                    .insert(definition.name.clone(), (definition, WorkflowSource::Directory(dir.clone())));
            }
        }
        Ok(catalog)
    }

    /// Add or replace a definition.
    pub fn insert(&mut self, definition: WorkflowDefinition) {
        self.definitions.insert(definition.name.clone(), (definition, WorkflowSource::Inline));
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.definitions.get(name).map(|(d, _)| d)
    }

    /// Where a definition came from.
    pub fn source(&self, name: &str) -> Option<&WorkflowSource> {
        self.definitions.get(name).map(|(_, s)| s)
    }

    /// All definitions, sorted by name.
    pub fn definitions(&self) -> impl Iterator<Item = &WorkflowDefinition> {
        self.definitions.values().map(|(d, _)| d)
    }

    /// Names of all definitions, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The extension chain ending at `name`, root first.
    pub fn chain(&self, name: &str) -> Result<Vec<&WorkflowDefinition>, WorkflowError> {
        let mut chain = Vec::new();
        let mut visited: Vec<String> = Vec::new();
        let mut current = name;

        loop {
            if visited.iter().any(|v| v == current) {
                visited.push(current.to_string());
                visited.reverse();
                return Err(WorkflowError::Cycle { chain: visited });
            }
            visited.push(current.to_string());

            let definition = self
                .get(current)
                .ok_or_else(|| WorkflowError::UnknownWorkflow(current.to_string()))?;
            chain.push(definition);

            match &definition.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Resolve the chain ending at `name`.
    pub fn resolve(&self, name: &str) -> Result<ResolvedWorkflow, WorkflowError> {
        let chain = self.chain(name)?;
        let (base, extensions) = chain
            .split_first()
            .ok_or_else(|| WorkflowError::UnknownWorkflow(name.to_string()))?;
        let extensions: Vec<WorkflowDefinition> = extensions.iter().map(|d| (*d).clone()).collect();
        resolve(base, &extensions)
    }
}
