//! Feature directory detector.
//!
//! Treats each child directory of a feature-like root (`src/features`,
//! `modules`, `packages`, ...) as one feature unit.

use std::path::{Path, PathBuf};

use super::{kinds, Codebase, Detector, DetectorError, DetectorParams, Signal};
use crate::artifact::slugify;

const DEFAULT_ROOTS: &[&str] = &[
    "src/features",
    "features",
    "src/modules",
    "modules",
    "apps",
    "packages",
    "src/domains",
    "domains",
];

/// Detector for feature-like directory groupings.
///
/// Accepts a `roots` parameter (comma separated) replacing the default roots.
pub struct FeatureDetector;

impl Detector for FeatureDetector {
    fn name(&self) -> &str {
        "features"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        let roots: Vec<String> = match params.get("roots") {
            Some(list) => list
                .split(',')
                .map(|r| r.trim().trim_end_matches('/').to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            None => DEFAULT_ROOTS.iter().map(|r| (*r).to_string()).collect(),
        };

        let mut signals = Vec::new();
        let mut names = Vec::new();

        for root in &roots {
            if !codebase.is_dir(Path::new(root)) {
                continue;
            }
            let pattern = format!("{root}/*");
            let children: Vec<PathBuf> = codebase
                .list_matching(&[pattern.as_str()])?
                .into_iter()
                .filter(|p| codebase.is_dir(p))
                .collect();

            for dir in children {
                let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let slug = slugify(name);
                if slug.is_empty() {
                    continue;
                }
                tracing::debug!(feature = name, root = root.as_str(), "Found feature directory");
                signals.push(
                    Signal::new(self.name(), kinds::FEATURE, name, 0.7)
                        .with("path", dir.display().to_string())
                        .with("slug", slug),
                );
                names.push(name.to_string());
            }
        }

        if !names.is_empty() {
            signals.push(
                Signal::new(self.name(), kinds::FEATURE_LIST, names.join(", "), 0.6)
                    .with("count", names.len().to_string()),
            );
        }

        Ok(signals)
    }
}
