//! Runtime configuration.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. TOML file (explicit path, or the platform default if it exists)
//! 3. `STORYBOOK_*` environment variables

use crate::paths::StorybookPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storybook_core::error::{Result, StorybookError};

/// Configuration for the storybook repository and its binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorybookConfig {
    /// Root of the data tree; books live in `<data_root>/book`.
    pub data_root: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for StorybookConfig {
    fn default() -> Self {
        Self {
            data_root: StorybookPaths::default_data_root()
                .unwrap_or_else(|_| PathBuf::from("./data")),
            log_level: "info".to_string(),
        }
    }
}

impl StorybookConfig {
    pub const DATA_ROOT_ENV: &'static str = "STORYBOOK_DATA_ROOT";
    pub const LOG_LEVEL_ENV: &'static str = "STORYBOOK_LOG_LEVEL";

    /// Loads configuration from file and process environment.
    ///
    /// An explicit `path` must exist. Without one, the platform default
    /// config file is read only if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match StorybookPaths::default_config_file() {
                Ok(default_path) if default_path.is_file() => Self::from_file(&default_path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorybookError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `STORYBOOK_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(Self::DATA_ROOT_ENV).filter(|v| !v.is_empty()) {
            self.data_root = PathBuf::from(root);
        }
        if let Some(level) = lookup(Self::LOG_LEVEL_ENV).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn paths(&self) -> StorybookPaths {
        StorybookPaths::new(self.data_root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StorybookConfig::from_toml_str("data_root = \"/srv/storybook\"").unwrap();
        assert_eq!(config.data_root, PathBuf::from("/srv/storybook"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        let err = StorybookConfig::from_toml_str("data_root = [").unwrap_err();
        assert!(matches!(err, StorybookError::Serialization { .. }));
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            (StorybookConfig::DATA_ROOT_ENV, "/env/root"),
            (StorybookConfig::LOG_LEVEL_ENV, "debug"),
        ]);
        let mut config = StorybookConfig::from_toml_str("data_root = \"/file/root\"").unwrap();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_root, PathBuf::from("/env/root"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = StorybookConfig::from_toml_str("log_level = \"warn\"").unwrap();
        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_explicit_missing_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = StorybookConfig::load(Some(&temp_dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, StorybookError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "data_root = \"/a\"\nlog_level = \"trace\"\n").unwrap();

        let config = StorybookConfig::from_file(&path).unwrap();
        assert_eq!(config.paths().book_root(), PathBuf::from("/a/book"));
        assert_eq!(config.log_level, "trace");
    }
}
