//! # teeclip-keys
//!
//! Custody of the store key under different trust models.
//!
//! Every provider implements [`KeyProvider`]; the history store and the row
//! codec only ever see the trait object.
//!
//! | Trust model  | Provider                         | Custody on disk            |
//! |--------------|----------------------------------|----------------------------|
//! | `os-session` | [`os_session::WindowsCredentialKeyProvider`] | `key.ref` + Credential Manager |
//! | `os-session` | [`os_session::MacKeychainKeyProvider`]       | `key.ref` + Keychain           |
//! | `os-session` | [`os_session::SecretServiceKeyProvider`]     | `key.ref` + Secret Service     |
//! | `os-session` | [`file::FileKeyProvider`] (headless fallback) | `key.bin`, owner-only    |
//! | `password`   | [`password::PasswordKeyProvider`] | salt in store metadata     |

pub mod file;
pub mod os_session;
pub mod password;
pub mod select;

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use teeclip_crypto::{CryptoError, Key};

/// Raw key file written by the file provider.
pub const KEY_FILE_NAME: &str = "key.bin";

/// Opaque reference to a credential held by the OS facility.
pub const KEY_REF_FILE_NAME: &str = "key.ref";

/// Service name under which OS facilities hold the key.
pub const SERVICE_NAME: &str = "teeclip";

/// Key custody error types.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// No facility or key file could supply a key.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),

    /// Stored key material has the wrong shape.
    #[error("stored key is corrupted: {0}")]
    CorruptKey(String),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("password prompt failed: {0}")]
    Prompt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

pub type Result<T> = std::result::Result<T, KeyError>;

/// Source of authority protecting the store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustModel {
    /// The logged-in OS session (credential facility or key file).
    #[default]
    #[serde(alias = "os")]
    OsSession,
    /// A password typed by the user.
    Password,
}

impl TrustModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustModel::OsSession => "os-session",
            TrustModel::Password => "password",
        }
    }
}

impl fmt::Display for TrustModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "os-session" | "os" => Ok(TrustModel::OsSession),
            "password" => Ok(TrustModel::Password),
            other => Err(format!("unknown trust model '{other}'")),
        }
    }
}

/// Capability set shared by every key custody variant.
pub trait KeyProvider: Send + Sync {
    /// Short facility label, for logs.
    fn name(&self) -> &'static str;

    /// Whether custody for a key already exists.
    fn has_key(&self) -> bool;

    /// Whether the backing facility can be reached right now.
    fn is_available(&self) -> bool {
        true
    }

    /// Return the active key.
    ///
    /// Idempotent within a process: after the first success the same key is
    /// returned without prompting or touching the facility again. Missing
    /// custody is [`KeyError::KeyUnavailable`]; this never creates a key.
    fn obtain_key(&self) -> Result<Key>;

    /// Create a new key (first-time setup), store its custody and cache it.
    fn generate_key(&self) -> Result<Key>;

    /// Forget the cached key and destroy its custody.
    fn wipe(&self) -> Result<()>;
}

/// In-process cache that makes `obtain_key` idempotent.
#[derive(Default)]
pub(crate) struct KeyCache {
    slot: Mutex<Option<Key>>,
}

impl KeyCache {
    pub(crate) fn get(&self) -> Option<Key> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn set(&self, key: &Key) {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(key.clone());
    }

    pub(crate) fn clear(&self) {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }

    /// Return the cached key, or run `load` once and cache its result.
    pub(crate) fn get_or_load(&self, load: impl FnOnce() -> Result<Key>) -> Result<Key> {
        if let Some(key) = self.get() {
            return Ok(key);
        }
        let key = load()?;
        self.set(&key);
        Ok(key)
    }
}
