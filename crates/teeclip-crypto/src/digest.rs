//! SHA-256 digests used for deduplication and size masking.
//!
//! ## Modes
//!
//! - [`plain_digest`]: SHA-256 of a payload, used for unencrypted rows
//! - [`keyed_digest`]: HMAC-SHA256 of a payload under the store key, used
//!   for encrypted rows so stored hashes cannot be tested against guesses
//! - [`mask_size`]: XOR mask over a payload length, derived from the key and
//!   the row's digest

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::{CryptoError, Key, Result};

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded SHA-256 hash of `data`.
pub fn plain_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: crate::key::KEY_SIZE,
        actual: key.len(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Hex-encoded HMAC-SHA256 of `data` under `key`.
///
/// Deterministic for a given key, so identical content encrypted twice still
/// produces the same digest and deduplication keeps working.
pub fn keyed_digest(key: &Key, data: &[u8]) -> Result<String> {
    Ok(hex::encode(hmac_sha256(key.as_bytes(), data)?))
}

/// Per-row 4-byte size mask: the big-endian leading bytes of
/// `HMAC-SHA256(key, digest)`.
pub fn size_mask(key: &Key, digest: &str) -> Result<u32> {
    let mac = hmac_sha256(key.as_bytes(), digest.as_bytes())?;
    Ok(u32::from_be_bytes([mac[0], mac[1], mac[2], mac[3]]))
}

/// XOR `size` with the row's mask. Applying it twice returns the input.
pub fn mask_size(size: u64, key: &Key, digest: &str) -> Result<u64> {
    Ok(size ^ u64::from(size_mask(key, digest)?))
}
