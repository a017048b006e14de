//! Configuration file management.
//!
//! `$TEECLIP_HOME/config.toml` (default `~/.teeclip/config.toml`). Every key
//! is optional; a missing file means all defaults.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use teeclip_history::{EncryptionMode, HistoryConfig};
use teeclip_keys::TrustModel;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "TEECLIP_HOME";

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "history.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeeclipConfig {
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub security: SecuritySection,
    #[serde(default)]
    pub output: OutputSection,
}

/// `[history]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySection {
    /// Record saved clips at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0 = keep everything.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
    /// Clips shown by `teeclip list` without an argument.
    #[serde(default = "default_list_count")]
    pub list_count: usize,
}

/// `[security]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySection {
    #[serde(default)]
    pub encryption: EncryptionMode,
    #[serde(default)]
    pub auth_method: TrustModel,
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub quiet: bool,
    /// "error" | "warn" | "info" | "debug" | "trace". `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> u32 {
    50
}

fn default_preview_length() -> usize {
    80
}

fn default_list_count() -> usize {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            preview_length: default_preview_length(),
            list_count: default_list_count(),
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            quiet: false,
            log_level: default_log_level(),
        }
    }
}

impl TeeclipConfig {
    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings handed to the history store.
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            max_entries: self.history.max_entries,
            preview_length: self.history.preview_length,
            encryption: self.security.encryption,
            trust_model: self.security.auth_method,
        }
    }
}

/// Data directory: `$TEECLIP_HOME`, else `~/.teeclip`.
pub fn data_dir() -> PathBuf {
    resolve_data_dir(std::env::var_os(HOME_ENV), user_home())
}

fn resolve_data_dir(override_dir: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    match override_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home
            .unwrap_or_else(std::env::temp_dir)
            .join(".teeclip"),
    }
}

fn user_home() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
