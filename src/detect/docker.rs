//! Container and deployment detector.
//!
//! Looks for Dockerfiles, Docker Compose files and Kubernetes/Helm layouts.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{kinds, read_optional, Codebase, Detector, DetectorError, DetectorParams, Signal};

const COMPOSE_FILES: &[&str] =
    &["docker-compose.yml", "docker-compose.yaml", "compose.yml", "compose.yaml"];

/// Detector for deployment tooling.
pub struct DockerDetector;

impl Detector for DockerDetector {
    fn name(&self) -> &str {
        "docker"
    }

    fn detect(
        &self,
        codebase: &dyn Codebase,
        _params: &DetectorParams,
    ) -> Result<Vec<Signal>, DetectorError> {
        let mut signals = Vec::new();

        if let Some(content) = read_optional(codebase, "Dockerfile")? {
            let mut signal = Signal::new(self.name(), kinds::DEPLOYMENT, "Docker", 0.7)
                .with("path", "Dockerfile");
            if let Some(image) = base_image(&content) {
                signal = signal.with("evidence", format!("FROM {image}"));
            }
            signals.push(signal);
        }

        let compose_path = codebase.list_matching(COMPOSE_FILES)?.into_iter().next();
        if let Some(path) = compose_path {
            let content = codebase.read_head(&path, codebase.max_read_bytes())?;
            let compose: Compose =
                serde_yaml::from_str(&content).map_err(|e| DetectorError::parse(&path, e))?;
            let services: Vec<&str> = compose.services.keys().map(String::as_str).collect();
            signals.push(
                Signal::new(self.name(), kinds::DEPLOYMENT, "Docker Compose", 0.8)
                    .with("path", path.display().to_string())
                    .with("evidence", services.join(", ")),
            );
        }

        let k8s = codebase.list_matching(&["k8s", "kubernetes", "deploy/k8s", "**/Chart.yaml"])?;
        if let Some(path) = k8s.first() {
            signals.push(
                Signal::new(self.name(), kinds::DEPLOYMENT, "Kubernetes", 0.7)
                    .with("path", path.display().to_string()),
            );
        }

        Ok(signals)
    }
}

/// First base image named in a Dockerfile.
fn base_image(dockerfile: &str) -> Option<&str> {
    dockerfile.lines().map(str::trim).find_map(|line| {
        let rest = line.strip_prefix("FROM ").or_else(|| line.strip_prefix("from "))?;
        rest.split_whitespace().find(|part| !part.starts_with("--"))
    })
}

/// Docker Compose file (only services are needed).
#[derive(Debug, Deserialize)]
struct Compose {
    #[serde(default)]
    services: BTreeMap<String, serde_yaml::Value>,
}
