//! # teeclip-history
//!
//! The clip history store: deduplicated, bounded, optionally encrypted.
//!
//! ## Modules
//!
//! - [`store`]: [`HistoryStore`], save/list/get/clear and bulk encryption
//! - [`selector`]: Position selectors such as `2,4:10`
//! - [`preview`]: One-line excerpts for listings
//! - [`config`]: [`HistoryConfig`]

pub mod config;
pub mod preview;
pub mod selector;
pub mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use teeclip_crypto::CryptoError;
use teeclip_db::DbError;
use teeclip_keys::{KeyError, TrustModel};

pub use config::{EncryptionMode, HistoryConfig};
pub use selector::{Selector, SelectorParseError};
pub use store::HistoryStore;

/// Error types for history operations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// No key provider is attached, or it cannot produce a key.
    #[error("encryption key unavailable: {0}")]
    KeyUnavailable(String),

    /// A row failed authentication under the current key.
    #[error("decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("schema migration failed: {0}")]
    SchemaMigrationFailed(String),

    #[error("invalid selector: {0}")]
    SelectorParse(#[from] SelectorParseError),

    #[error("not found: {0}")]
    NotFound(String),

    /// Encrypted rows belong to a different trust model than the configured one.
    #[error(
        "history is encrypted under the {recorded} trust model but {configured} is configured; \
         decrypt first"
    )]
    TrustModelMismatch {
        recorded: TrustModel,
        configured: TrustModel,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(DbError),

    #[error("key error: {0}")]
    Keys(KeyError),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<DbError> for HistoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::SchemaMigrationFailed(msg) => HistoryError::SchemaMigrationFailed(msg),
            DbError::NotFound(msg) => HistoryError::NotFound(msg),
            other => HistoryError::Db(other),
        }
    }
}

impl From<rusqlite::Error> for HistoryError {
    fn from(err: rusqlite::Error) -> Self {
        HistoryError::Db(DbError::Sqlite(err))
    }
}

impl From<CryptoError> for HistoryError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => HistoryError::DecryptionFailed,
            other => HistoryError::Crypto(other),
        }
    }
}

impl From<KeyError> for HistoryError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::KeyUnavailable(msg) => HistoryError::KeyUnavailable(msg),
            KeyError::Crypto(inner) => inner.into(),
            other => HistoryError::Keys(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Where a clip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipSource {
    /// Standard input of a pipeline.
    #[default]
    Pipe,
    /// Read from the system clipboard.
    Clipboard,
    /// Entered by hand.
    Manual,
}

impl ClipSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipSource::Pipe => "pipe",
            ClipSource::Clipboard => "clipboard",
            ClipSource::Manual => "manual",
        }
    }
}

impl fmt::Display for ClipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClipSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pipe" => Ok(ClipSource::Pipe),
            "clipboard" => Ok(ClipSource::Clipboard),
            "manual" => Ok(ClipSource::Manual),
            other => Err(format!("unknown clip source '{other}'")),
        }
    }
}

/// Listing view of a stored clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipEntry {
    /// 1-based recency position at the time of the query.
    pub position: usize,
    pub id: i64,
    pub timestamp: String,
    pub content_type: String,
    pub size: u64,
    pub preview: String,
    pub source: ClipSource,
    /// Stored encrypted.
    pub encrypted: bool,
    /// Still encrypted in this view: no key was available, so `content_type`,
    /// `size` and `preview` are the stored placeholders.
    pub sealed: bool,
}

/// A clip with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub entry: ClipEntry,
    /// Plaintext, or the stored ciphertext when `entry.sealed`.
    pub content: Vec<u8>,
}

/// Bulk transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Encryption bookkeeping recorded in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionState {
    pub enabled: bool,
    /// Trust model of the key that encrypted the current rows.
    pub trust_model: Option<TrustModel>,
    pub encrypted_rows: usize,
    pub total_rows: usize,
}
