//! Artifact stores.
//!
//! Publishing is two-phase: content is staged under a hidden identity and
//! only becomes visible under its real name on commit.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;

use super::ArtifactError;

/// An artifact written to a staging identity but not yet visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    /// Final name, relative to the store root
    pub name: String,

    /// Unique staging id
    pub staging_id: String,

    /// Where the staged content currently lives
    pub location: PathBuf,
}

/// Durable sink for generated artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Write content under a staging identity.
    fn stage(&self, name: &str, content: &str) -> Result<StagedArtifact, ArtifactError>;

    /// Publish a staged artifact under its final name, replacing any previous one.
    fn commit(&self, staged: StagedArtifact) -> Result<PathBuf, ArtifactError>;

    /// Drop a staged artifact without publishing it.
    fn discard(&self, staged: StagedArtifact) -> Result<(), ArtifactError>;
}

/// Reject names that would escape the store root.
fn check_name(name: &str) -> Result<&Path, ArtifactError> {
    let path = Path::new(name);
    let escapes = path.components().any(|c| !matches!(c, Component::Normal(_)));
    if name.is_empty() || escapes {
        return Err(ArtifactError::render(name, "artifact name must be a relative path inside the output directory"));
    }
    Ok(path)
}

/// Store writing into a directory on disk.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for FsArtifactStore {
    fn stage(&self, name: &str, content: &str) -> Result<StagedArtifact, ArtifactError> {
        let relative = check_name(name)?;
        let target = self.root.join(relative);
        let dir = target.parent().unwrap_or(&self.root).to_path_buf();
        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArtifactError::render(name, "artifact name has no file name"))?;

        std::fs::create_dir_all(&dir).map_err(|e| ArtifactError::write(&dir, e))?;

        let staging_id = uuid::Uuid::new_v4().to_string();
        let location = dir.join(format!(".{file_name}.{staging_id}.staging"));
        std::fs::write(&location, content).map_err(|e| ArtifactError::write(&location, e))?;

        tracing::debug!(artifact = name, staging = ?location, "Staged artifact");
        Ok(StagedArtifact { name: name.to_string(), staging_id, location })
    }

    fn commit(&self, staged: StagedArtifact) -> Result<PathBuf, ArtifactError> {
        let target = self.root.join(check_name(&staged.name)?);
        std::fs::rename(&staged.location, &target).map_err(|e| ArtifactError::write(&target, e))?;
        tracing::info!(artifact = staged.name.as_str(), path = ?target, "Committed artifact");
        Ok(target)
    }

    fn discard(&self, staged: StagedArtifact) -> Result<(), ArtifactError> {
        match std::fs::remove_file(&staged.location) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ArtifactError::write(&staged.location, e)),
        }
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    staged: Mutex<BTreeMap<String, String>>,
    committed: Mutex<BTreeMap<String, String>>,
    fail_commits: bool,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose commits always fail.
    pub fn failing() -> Self {
        Self { fail_commits: true, ..Self::default() }
    }

    /// Committed content by name.
    pub fn get(&self, name: &str) -> Option<String> {
        self.committed.lock().get(name).cloned()
    }

    /// Names of committed artifacts, sorted.
    pub fn names(&self) -> Vec<String> {
        self.committed.lock().keys().cloned().collect()
    }

    /// Number of artifacts staged but neither committed nor discarded.
    pub fn pending(&self) -> usize {
        self.staged.lock().len()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn stage(&self, name: &str, content: &str) -> Result<StagedArtifact, ArtifactError> {
        check_name(name)?;
        let staging_id = uuid::Uuid::new_v4().to_string();
        self.staged.lock().insert(staging_id.clone(), content.to_string());
        Ok(StagedArtifact {
            name: name.to_string(),
            location: PathBuf::from(format!("memory://{staging_id}")),
            staging_id,
        })
    }

    fn commit(&self, staged: StagedArtifact) -> Result<PathBuf, ArtifactError> {
        if self.fail_commits {
            return Err(ArtifactError::write(
                &staged.name,
                std::io::Error::new(std::io::ErrorKind::Other, "commit refused"),
            ));
        }
        let content = self.staged.lock().remove(&staged.staging_id).ok_or_else(|| {
            ArtifactError::write(
                &staged.location,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )
        })?;
        self.committed.lock().insert(staged.name.clone(), content);
        Ok(PathBuf::from(staged.name))
    }

    fn discard(&self, staged: StagedArtifact) -> Result<(), ArtifactError> {
        self.staged.lock().remove(&staged.staging_id);
        Ok(())
    }
}
