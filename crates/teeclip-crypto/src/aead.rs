//! AES-256-GCM authenticated encryption.
//!
//! Every sealed blob carries its own random nonce:
//!
//! ```text
//! [12-byte nonce][ciphertext][16-byte tag]
//! ```
//!
//! This is the layout of every encrypted `content` column, including rows
//! written before schema v2.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key as CipherKey, Nonce,
};
use rand::RngCore;

use crate::{CryptoError, Key, Result};

/// GCM nonce size (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits = 16 bytes).
pub const TAG_SIZE: usize = 16;

/// Bytes a sealed blob adds on top of the plaintext.
pub const OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// Generate a fresh random nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under a caller-chosen nonce.
///
/// Returns ciphertext with the 16-byte tag appended. The nonce must never be
/// reused with the same key; [`seal`] is the normal entry point.
pub fn encrypt(key: &Key, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(CipherKey::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt ciphertext-with-tag produced by [`encrypt`].
pub fn decrypt(key: &Key, nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(CipherKey::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt with a fresh nonce, returning `[nonce][ciphertext][tag]`.
pub fn seal(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = generate_nonce();
    let ciphertext = encrypt(key, &nonce, plaintext)?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Authenticate and decrypt a blob produced by [`seal`].
///
/// Blobs too short to hold a nonce and tag fail the same way a bad tag does.
pub fn open(key: &Key, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < OVERHEAD {
        return Err(CryptoError::DecryptionFailed);
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let mut nonce_arr = [0u8; NONCE_SIZE];
    nonce_arr.copy_from_slice(nonce);
    decrypt(key, &nonce_arr, ciphertext)
}
