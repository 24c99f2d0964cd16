use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/chat";

/// Persisted settings. Missing fields fall back to CLI flags, environment
/// variables, or the built-in default at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join("agentchat"))
            .unwrap_or_else(|| PathBuf::from(".agentchat"))
            .join("config.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Read the config file, returning defaults when it is absent or
    /// unparseable. A broken config file never blocks startup.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config at {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Write the config atomically: a temp file in the same directory is
    /// renamed over the destination so a crash never leaves a half-written
    /// file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {parent:?}"))?;
        }

        let content = serde_json::to_string_pretty(self).context("serializing config")?;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)
            .with_context(|| format!("writing temp config {temp_path:?}"))?;
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("renaming temp config into place at {path:?}"))?;

        info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            endpoint: Some("http://localhost:9000/api/chat".to_string()),
            api_key: Some("sk-test".to_string()),
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_corrupt_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("config.json");
        Config::default().save_to(&path).unwrap();
        assert!(path.exists());
    }
}
