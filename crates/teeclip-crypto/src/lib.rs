//! # teeclip-crypto
//!
//! Cryptographic primitives for the teeclip history store, and the row codec
//! that turns a plaintext clip into a fingerprint-resistant encrypted record.
//!
//! The suite is fixed; there is no algorithm negotiation.
//!
//! ## Modules
//!
//! - [`aead`]: AES-256-GCM sealing with `[nonce][ciphertext][tag]` blobs
//! - [`digest`]: SHA-256 and HMAC-SHA256 digests, size masking
//! - [`kdf`]: PBKDF2-HMAC-SHA256 password key derivation
//! - [`key`]: The 32-byte store key, zeroized on drop
//! - [`row`]: Per-row encrypt/decrypt transform

pub mod aead;
pub mod digest;
pub mod kdf;
pub mod key;
pub mod row;

pub use key::Key;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AEAD authentication failed (wrong key or corrupted data).
    #[error("decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    /// AEAD encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
