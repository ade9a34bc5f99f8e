//! Configuration management for Personify.
//!
//! Configuration is loaded from a platform config directory with sensible
//! defaults. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Personify.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Score fusion settings
    pub fusion: FusionConfig,

    /// Semantic search settings
    pub search: SearchConfig,

    /// Persona selection settings
    pub selection: SelectionConfig,

    /// Collaborator model settings
    pub models: ModelsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// ~/.personify/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "personify", "personify")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".personify").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Get the resolved data directory path (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        let path_str = self.general.data_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Path to the persona catalog CSV (required artifact).
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir().join("persona_catalog.csv")
    }

    /// Path to the probe question list (required artifact).
    pub fn questions_path(&self) -> PathBuf {
        self.data_dir().join("vqa_questions.txt")
    }

    /// Directory holding the pre-built word-vector synonym index
    /// (optional artifact — fusion degrades gracefully without it).
    pub fn synonyms_dir(&self) -> PathBuf {
        self.data_dir().join("synonyms")
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.selection.output_count, 5);
        assert!((config.fusion.detection_score - 1.0).abs() < 1e-6);
        assert!((config.fusion.vqa_score - 0.9).abs() < 1e-6);
        assert_eq!(config.fusion.synonym_top_k, 5);
        assert!((config.search.distance_threshold - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[fusion]"));
        assert!(toml.contains("[selection]"));
    }

    #[test]
    fn test_artifact_paths_under_data_dir() {
        let mut config = Config::default();
        config.general.data_dir = PathBuf::from("/data/personify");
        assert_eq!(
            config.catalog_path(),
            PathBuf::from("/data/personify/persona_catalog.csv")
        );
        assert_eq!(
            config.questions_path(),
            PathBuf::from("/data/personify/vqa_questions.txt")
        );
        assert_eq!(
            config.synonyms_dir(),
            PathBuf::from("/data/personify/synonyms")
        );
    }

    #[test]
    fn test_load_from_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.selection.output_count = 3;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.selection.output_count, 3);
    }
}
