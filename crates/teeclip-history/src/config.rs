//! History store configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use teeclip_keys::TrustModel;

fn default_max_entries() -> u32 {
    50
}

fn default_preview_length() -> usize {
    80
}

/// Whether new clips are encrypted at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMode {
    #[default]
    #[serde(alias = "none")]
    Off,
    #[serde(alias = "aes256")]
    On,
}

impl EncryptionMode {
    pub fn is_on(self) -> bool {
        self == EncryptionMode::On
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncryptionMode::Off => "off",
            EncryptionMode::On => "on",
        })
    }
}

impl FromStr for EncryptionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "none" => Ok(EncryptionMode::Off),
            "on" | "aes256" => Ok(EncryptionMode::On),
            other => Err(format!("unknown encryption mode '{other}'")),
        }
    }
}

/// Settings the store needs. Passed by value to [`crate::HistoryStore::open`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Retention bound. 0 keeps every clip.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,

    #[serde(default = "default_preview_length")]
    pub preview_length: usize,

    #[serde(default)]
    pub encryption: EncryptionMode,

    #[serde(default)]
    pub trust_model: TrustModel,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            preview_length: default_preview_length(),
            encryption: EncryptionMode::default(),
            trust_model: TrustModel::default(),
        }
    }
}

impl HistoryConfig {
    /// Default configuration with encryption switched on.
    pub fn encrypted(trust_model: TrustModel) -> Self {
        Self {
            encryption: EncryptionMode::On,
            trust_model,
            ..Self::default()
        }
    }
}
