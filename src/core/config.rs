//! Configuration management for fddflow.
//!
//! Handles loading and saving configuration from TOML files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the per-project configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".fddflow.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Detector settings
    pub detection: DetectionConfig,

    /// Proposal settings
    pub proposals: ProposalConfig,

    /// Artifact generation settings
    pub artifacts: ArtifactConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default validation threshold (percent) when a workflow sets none
    pub threshold: f64,

    /// Extra directories searched for workflow definitions
    pub workflow_dirs: Vec<PathBuf>,
}

/// Detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detectors run by `detect` when none are named explicitly
    pub enabled: Vec<String>,

    /// Time budget for a single detector, in milliseconds
    pub timeout_ms: u64,

    /// Maximum directory depth walked below the codebase root
    pub max_depth: usize,

    /// Directories never descended into
    pub ignore_dirs: Vec<String>,

    /// Maximum number of bytes a detector reads from one file
    pub max_read_bytes: usize,

    /// Detector-specific parameters, keyed by detector name
    pub params: BTreeMap<String, BTreeMap<String, String>>,
}

/// Proposal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    /// Proposals below this confidence are not offered to the human
    pub min_confidence: f64,
}

/// Artifact generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory generated artifacts are committed to, relative to the working directory
    pub output_dir: PathBuf,

    /// Weight of proposed and edited answers in the acceptance score
    pub proposed_weight: f64,

    /// Weight of manually entered answers in the acceptance score
    pub manual_weight: f64,

    /// Confidence recorded for manually entered answers
    pub manual_confidence: f64,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.fddflow.toml` in current directory
    /// 2. `~/.config/fddflow/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&dir)?;

        let content = toml::to_string_pretty(self)?;
        std::fs::write(dir.join("config.toml"), content)?;

        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("fddflow"))
    }

    /// Parameters configured for a detector (empty when none are set).
    pub fn detector_params(&self, detector: &str) -> BTreeMap<String, String> {
        self.detection.params.get(detector).cloned().unwrap_or_default()
    }

    /// Reject values that would make scoring meaningless.
    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=100.0).contains(&self.general.threshold) {
            anyhow::bail!("general.threshold must be between 0 and 100");
        }
        if !(0.0..=1.0).contains(&self.proposals.min_confidence) {
            anyhow::bail!("proposals.min_confidence must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&self.artifacts.manual_confidence) {
            anyhow::bail!("artifacts.manual_confidence must be between 0 and 1");
        }
        if self.artifacts.proposed_weight < 0.0 || self.artifacts.manual_weight < 0.0 {
            anyhow::bail!("artifact weights cannot be negative");
        }
        if self.detection.timeout_ms == 0 {
            anyhow::bail!("detection.timeout_ms must be greater than zero");
        }
        Ok(())
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { threshold: 90.0, workflow_dirs: Vec::new() }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: crate::detect::DetectorRegistry::builtin()
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            timeout_ms: 5_000,
            max_depth: 6,
            ignore_dirs: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "target".to_string(),
                "dist".to_string(),
                "build".to_string(),
                "vendor".to_string(),
                "__pycache__".to_string(),
                ".venv".to_string(),
            ],
            max_read_bytes: 64 * 1024,
            params: BTreeMap::new(),
        }
    }
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self { min_confidence: 0.3 }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("docs/fdd"),
            proposed_weight: 1.0,
            manual_weight: 0.5,
            manual_confidence: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!((config.general.threshold - 90.0).abs() < f64::EPSILON);
        assert_eq!(config.detection.timeout_ms, 5_000);
        assert!(config.detection.enabled.contains(&"npm".to_string()));
        assert!(config.detection.ignore_dirs.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[detection]"));
        assert!(toml_str.contains("[artifacts]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            threshold = 70.0

            [detection]
            enabled = ["npm", "features"]
            timeout_ms = 250

            [detection.params.features]
            roots = "src/modules"

            [proposals]
            min_confidence = 0.5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!((config.general.threshold - 70.0).abs() < f64::EPSILON);
        assert_eq!(config.detection.enabled, vec!["npm", "features"]);
        assert_eq!(config.detection.timeout_ms, 250);
        assert_eq!(config.detector_params("features").get("roots").unwrap(), "src/modules");
        assert!(config.detector_params("npm").is_empty());
        assert!((config.proposals.min_confidence - 0.5).abs() < f64::EPSILON);
        // untouched sections keep their defaults
        assert!((config.artifacts.manual_weight - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_file_rejects_bad_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nthreshold = 140.0\n").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[artifacts]\noutput_dir = \"out\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.artifacts.output_dir, PathBuf::from("out"));
    }
}
