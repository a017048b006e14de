//! Password key derivation.
//!
//! PBKDF2-HMAC-SHA256 with 600,000 iterations and a 16-byte random salt.
//! The salt lives in the store's metadata table; the key itself is never
//! persisted.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::key::KEY_SIZE;
use crate::{CryptoError, Key, Result};

/// Production iteration count.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Salt length in bytes.
pub const SALT_SIZE: usize = 16;

/// Derive the store key from a password with the production iteration count.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<Key> {
    derive_key_custom(password, salt, PBKDF2_ITERATIONS)
}

/// Derive a key with a custom iteration count.
///
/// Tests use this with small counts; production callers go through
/// [`derive_key`].
pub fn derive_key_custom(password: &[u8], salt: &[u8], iterations: u32) -> Result<Key> {
    if iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be positive".to_string(),
        ));
    }
    let mut output = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut output);
    Ok(Key::from_bytes(output))
}

/// Generate a random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
