//! Application configuration (`config.toml`)
//!
//! Every section and key is optional; anything missing falls back to the
//! defaults below. Command-line flags are applied on top by the CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scheduler::DEFAULT_TICK_SECS;
use crate::search::DEFAULT_ACCELERATOR;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "./data/config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// SQLite database holding the directory configuration
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Gitignore-style exclusion file, re-read on every search
    #[serde(default = "default_ignore_file_path")]
    pub ignore_file_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            ignore_file_path: default_ignore_file_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: DEFAULT_TICK_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// External engine program name or path; empty disables it
    #[serde(default = "default_accelerator")]
    pub accelerator: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            accelerator: default_accelerator(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6688
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/codex-mcp.db")
}

fn default_ignore_file_path() -> PathBuf {
    PathBuf::from("./data/codex-ignore")
}

fn default_true() -> bool {
    true
}

fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}

fn default_accelerator() -> String {
    DEFAULT_ACCELERATOR.to_string()
}

impl AppConfig {
    /// Parse TOML text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config.toml")
    }

    /// Load the config file.
    ///
    /// An explicit path must exist. Without one, `./data/config.toml` is used
    /// if present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            log::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&text)?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Accelerator program, `None` when disabled
    pub fn accelerator(&self) -> Option<String> {
        let program = self.search.accelerator.trim();
        (!program.is_empty()).then(|| program.to_string())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:6688");
        assert_eq!(config.storage.db_path, PathBuf::from("./data/codex-mcp.db"));
        assert_eq!(config.storage.ignore_file_path, PathBuf::from("./data/codex-ignore"));
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_secs, 60);
        assert_eq!(config.accelerator().as_deref(), Some("rg"));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config = AppConfig::parse(
            r#"
            [server]
            port = 7000

            [search]
            accelerator = ""
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.storage, StorageConfig::default());
        assert!(config.accelerator().is_none());
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::parse("[server\nport = ").is_err());
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(AppConfig::load(Some(&temp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[scheduler]\nenabled = false\ntick_secs = 5\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_secs, 5);
    }
}
