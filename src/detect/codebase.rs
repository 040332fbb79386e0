//! Read-only access to the codebase under analysis.
//!
//! Detectors only ever see the narrow [`Codebase`] surface: list paths
//! matching glob patterns and read the head of a file. Nothing here writes.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use super::DetectorError;
use crate::core::config::DetectionConfig;

/// Default number of bytes a detector reads from a single file.
pub const DEFAULT_MAX_READ_BYTES: usize = 64 * 1024;

/// Read-only view of a codebase.
pub trait Codebase: Send + Sync {
    /// Root directory all paths are relative to.
    fn root(&self) -> &Path;

    /// List root-relative paths (files and directories) matching any of the
    /// glob patterns, sorted.
    fn list_matching(&self, patterns: &[&str]) -> Result<Vec<PathBuf>, DetectorError>;

    /// Read at most `max_bytes` from the start of a root-relative file.
    fn read_head(&self, path: &Path, max_bytes: usize) -> Result<String, DetectorError>;

    /// Whether a root-relative path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Per-file read cap applied by [`read_optional`].
    fn max_read_bytes(&self) -> usize {
        DEFAULT_MAX_READ_BYTES
    }
}

/// Read a file if it exists; a missing file yields `None`.
pub fn read_optional(
    codebase: &dyn Codebase,
    path: impl AsRef<Path>,
) -> Result<Option<String>, DetectorError> {
    match codebase.read_head(path.as_ref(), codebase.max_read_bytes()) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn compile(patterns: &[&str]) -> Result<GlobSet, DetectorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern).literal_separator(true).build().map_err(|e| {
            DetectorError::Pattern { pattern: (*pattern).to_string(), message: e.to_string() }
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| DetectorError::Pattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// Codebase on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalCodebase {
    root: PathBuf,
    max_depth: usize,
    ignore_dirs: Vec<String>,
    max_read_bytes: usize,
}

impl LocalCodebase {
    /// Create a codebase view rooted at `root` with default limits.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = DetectionConfig::default();
        Self::from_config(root, &defaults)
    }

    /// Create a codebase view using the detection settings.
    pub fn from_config(root: impl Into<PathBuf>, config: &DetectionConfig) -> Self {
        Self {
            root: root.into(),
            max_depth: config.max_depth,
            ignore_dirs: config.ignore_dirs.clone(),
            max_read_bytes: config.max_read_bytes,
        }
    }

    /// Set the maximum walk depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn should_skip(ignore_dirs: &[String], name: &str) -> bool {
        ignore_dirs.iter().any(|d| d == name)
    }
}

impl Codebase for LocalCodebase {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_matching(&self, patterns: &[&str]) -> Result<Vec<PathBuf>, DetectorError> {
        let set = compile(patterns)?;
        let ignore_dirs = self.ignore_dirs.clone();

        let walker = ignore::WalkBuilder::new(&self.root)
            .max_depth(Some(self.max_depth))
            .hidden(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                let name = entry.file_name().to_str().unwrap_or("");
                entry.depth() == 0 || !(is_dir && Self::should_skip(&ignore_dirs, name))
            })
            .build();

        let mut matches = BTreeSet::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            if set.is_match(relative) {
                matches.insert(relative.to_path_buf());
            }
        }

        Ok(matches.into_iter().collect())
    }

    fn read_head(&self, path: &Path, max_bytes: usize) -> Result<String, DetectorError> {
        let file = std::fs::File::open(self.root.join(path))?;
        let mut buf = Vec::new();
        file.take(max_bytes.min(self.max_read_bytes) as u64).read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.root.join(path).is_dir()
    }

    fn max_read_bytes(&self) -> usize {
        self.max_read_bytes
    }
}

/// In-memory codebase, used to exercise detectors without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryCodebase {
    root: PathBuf,
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryCodebase {
    /// Create an empty in-memory codebase.
    pub fn new() -> Self {
        Self { root: PathBuf::from("/memory"), ..Self::default() }
    }

    /// Add a file; parent directories are created implicitly.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        for ancestor in path.ancestors().skip(1) {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
        self.files.insert(path, content.into());
        self
    }

    /// Add an empty directory.
    #[must_use]
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
        self
    }
}

impl Codebase for MemoryCodebase {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_matching(&self, patterns: &[&str]) -> Result<Vec<PathBuf>, DetectorError> {
        let set = compile(patterns)?;
        let all: BTreeSet<&PathBuf> = self.files.keys().chain(self.dirs.iter()).collect();
        Ok(all.into_iter().filter(|p| set.is_match(p)).cloned().collect())
    }

    fn read_head(&self, path: &Path, max_bytes: usize) -> Result<String, DetectorError> {
        let content = self
            .files
            .get(path)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        let bytes = content.as_bytes();
        let end = bytes.len().min(max_bytes);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_list_matching() {
        let codebase = MemoryCodebase::new()
            .with_file("package.json", "{}")
            .with_file("src/features/auth/index.ts", "")
            .with_dir("src/features/billing");

        let root_only = codebase.list_matching(&["package.json"]).unwrap();
        assert_eq!(root_only, vec![PathBuf::from("package.json")]);

        let features = codebase.list_matching(&["src/features/*"]).unwrap();
        assert_eq!(
            features,
            vec![PathBuf::from("src/features/auth"), PathBuf::from("src/features/billing")]
        );
        assert!(codebase.is_dir(Path::new("src/features/auth")));
        assert!(!codebase.is_dir(Path::new("package.json")));
    }

    #[test]
    fn test_memory_read_head_truncates() {
        let codebase = MemoryCodebase::new().with_file("README.md", "hello world");
        assert_eq!(codebase.read_head(Path::new("README.md"), 5).unwrap(), "hello");
    }

    #[test]
    fn test_read_optional_missing_file() {
        let codebase = MemoryCodebase::new();
        assert!(read_optional(&codebase, "go.mod").unwrap().is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let codebase = MemoryCodebase::new();
        let err = codebase.list_matching(&["src/["]).unwrap_err();
        assert!(matches!(err, DetectorError::Pattern { .. }));
    }

    #[test]
    fn test_local_codebase_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/left-pad")).unwrap();
        std::fs::write(dir.path().join("node_modules/left-pad/package.json"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join("web")).unwrap();
        std::fs::write(dir.path().join("web/package.json"), "{}").unwrap();

        let codebase = LocalCodebase::new(dir.path());
        let found = codebase.list_matching(&["**/package.json"]).unwrap();
        assert_eq!(found, vec![PathBuf::from("package.json"), PathBuf::from("web/package.json")]);

        let content = codebase.read_head(Path::new("package.json"), 1024).unwrap();
        assert_eq!(content, "{}");
        assert!(codebase.is_dir(Path::new("web")));
    }
}
