//! `EngineConfig` — TOML-backed settings seeding `CompareOptions`, loaded
//! and saved the way the original application persisted its settings
//! (`~/.wavecompare/config.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::model::{CompareOptions, ThresholdStrategy};

const SETTINGS_DIR_NAME: &str = ".wavecompare";
const SETTINGS_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("failed to create config directory: {0}")]
    CreateDirectory(String),

    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to write config file: {0}")]
    Write(String),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("failed to parse config file: {0}")]
    Deserialize(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub max_level: u32,
    pub threshold_strategy: ThresholdStrategy,
    pub base_threshold: u8,
    pub resolve_conflicts: bool,
    pub interactive: bool,
    pub low_confidence_threshold: u8,
    pub min_confidence_threshold: u8,
    pub max_candidates: usize,
    pub confirmed_mappings_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let CompareOptions {
            max_level,
            threshold_strategy,
            base_threshold,
            resolve_conflicts,
            interactive,
            low_confidence_threshold,
            min_confidence_threshold,
            max_candidates,
            confirmed_mappings_path,
        } = CompareOptions::default();
        EngineConfig {
            max_level,
            threshold_strategy,
            base_threshold,
            resolve_conflicts,
            interactive,
            low_confidence_threshold,
            min_confidence_threshold,
            max_candidates,
            confirmed_mappings_path,
        }
    }
}

impl EngineConfig {
    pub fn to_compare_options(&self) -> CompareOptions {
        CompareOptions {
            max_level: self.max_level,
            threshold_strategy: self.threshold_strategy,
            base_threshold: self.base_threshold,
            resolve_conflicts: self.resolve_conflicts,
            interactive: self.interactive,
            low_confidence_threshold: self.low_confidence_threshold,
            min_confidence_threshold: self.min_confidence_threshold,
            max_candidates: self.max_candidates,
            confirmed_mappings_path: self.confirmed_mappings_path.clone(),
        }
    }

    pub fn load_from_default_path() -> Result<Option<Self>, EngineConfigError> {
        Self::load_from(&default_settings_path())
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, EngineConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|error| EngineConfigError::Read(error.to_string()))?;
        let config = toml::from_str::<EngineConfig>(&content).map_err(|error| EngineConfigError::Deserialize(error.to_string()))?;
        Ok(Some(config))
    }

    pub fn save_to_default_path(&self) -> Result<(), EngineConfigError> {
        self.save_to(&default_settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), EngineConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|error| EngineConfigError::CreateDirectory(error.to_string()))?;
        }
        let serialized = toml::to_string_pretty(self).map_err(|error| EngineConfigError::Serialize(error.to_string()))?;
        fs::write(path, serialized).map_err(|error| EngineConfigError::Write(error.to_string()))
    }
}

fn default_settings_dir() -> PathBuf {
    dirs_fallback_home().join(SETTINGS_DIR_NAME)
}

fn default_settings_path() -> PathBuf {
    default_settings_dir().join(SETTINGS_FILE_NAME)
}

/// No `dirs` crate in the dependency stack; fall back to `HOME` (or the
/// current directory if unset, e.g. in a minimal container).
fn dirs_fallback_home() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_compare_options_default() {
        let config = EngineConfig::default();
        let options = config.to_compare_options();
        assert_eq!(options.base_threshold, CompareOptions::default().base_threshold);
        assert_eq!(options.max_level, 0);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = EngineConfig::default();
        config.base_threshold = 70;
        config.threshold_strategy = ThresholdStrategy::Conservative;
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.base_threshold, 70);
        assert_eq!(loaded.threshold_strategy, ThresholdStrategy::Conservative);
    }

    #[test]
    fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(EngineConfig::load_from(&path).unwrap().is_none());
    }
}
