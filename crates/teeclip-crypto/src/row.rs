//! Per-row encryption transform.
//!
//! An encrypted row hides four things from anyone holding the database file
//! but not the key: the content, its type, its length and whether two rows
//! carry the same content.
//!
//! | Column           | Plaintext row        | Encrypted row                          |
//! |------------------|----------------------|----------------------------------------|
//! | `content`        | raw bytes            | `[nonce][ciphertext][tag]`             |
//! | `content_type`   | real type            | `(encrypted)`                          |
//! | `encrypted_meta` | empty                | sealed `{"content_type": ...}`         |
//! | `hash`           | `sha256(content)`    | `hmac_sha256(key, content)`            |
//! | `size`           | real length          | real length XOR per-row mask           |
//! | `preview`        | excerpt              | `(encrypted)`                          |

use serde::{Deserialize, Serialize};

use crate::{aead, digest, CryptoError, Key, Result};

/// Stored in place of the content type and preview of encrypted rows.
pub const ENCRYPTED_SENTINEL: &str = "(encrypted)";

/// Content type assumed for rows encrypted before `encrypted_meta` existed.
pub const PLAIN_TEXT_TYPE: &str = "text/plain";

/// Metadata sealed alongside the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RowMeta {
    content_type: String,
}

/// The encryption-related columns of a row, as written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRow {
    pub content: Vec<u8>,
    pub content_type: String,
    pub preview: String,
    pub hash: String,
    pub size: u64,
    /// Empty for rows encrypted under schema version 1.
    pub encrypted_meta: Vec<u8>,
}

/// What a legitimate key holder recovers from an [`EncryptedRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedRow {
    pub content: Vec<u8>,
    pub content_type: String,
    pub size: u64,
}

/// Encrypt a plaintext payload and its content type into row columns.
pub fn encrypt(content: &[u8], content_type: &str, key: &Key) -> Result<EncryptedRow> {
    let sealed_content = aead::seal(key, content)?;

    let meta = serde_json::to_vec(&RowMeta {
        content_type: content_type.to_string(),
    })
    .map_err(|e| CryptoError::Serialization(e.to_string()))?;
    let encrypted_meta = aead::seal(key, &meta)?;

    let hash = digest::keyed_digest(key, content)?;
    let size = digest::mask_size(content.len() as u64, key, &hash)?;

    Ok(EncryptedRow {
        content: sealed_content,
        content_type: ENCRYPTED_SENTINEL.to_string(),
        preview: ENCRYPTED_SENTINEL.to_string(),
        hash,
        size,
        encrypted_meta,
    })
}

/// Decrypt the stored columns of an encrypted row.
///
/// Fails with [`CryptoError::DecryptionFailed`] if either the content or the
/// metadata fails to authenticate. Nothing partially decrypted is returned.
pub fn decrypt(
    content: &[u8],
    encrypted_meta: &[u8],
    hash: &str,
    stored_size: u64,
    key: &Key,
) -> Result<DecryptedRow> {
    let plaintext = aead::open(key, content)?;

    let content_type = if encrypted_meta.is_empty() {
        PLAIN_TEXT_TYPE.to_string()
    } else {
        let meta_bytes = aead::open(key, encrypted_meta)?;
        let meta: RowMeta = serde_json::from_slice(&meta_bytes)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        meta.content_type
    };

    Ok(DecryptedRow {
        content: plaintext,
        content_type,
        size: digest::mask_size(stored_size, key, hash)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decrypt_row(row: &EncryptedRow, key: &Key) -> Result<DecryptedRow> {
        decrypt(&row.content, &row.encrypted_meta, &row.hash, row.size, key)
    }

    fn key() -> Key {
        Key::from_bytes([0x5Au8; 32])
    }

    #[test]
    fn test_roundtrip() {
        let key = key();
        let cases: [(&[u8], &str); 4] = [
            (b"hello world", "text/plain"),
            (b"", "text/plain"),
            (&[0x00, 0xFF, 0x80, 0x01], "application/octet-stream"),
            (b"\x89PNG\r\n", "image/png"),
        ];
        for (content, content_type) in cases {
            let row = encrypt(content, content_type, &key).expect("encrypt");
            let out = decrypt_row(&row, &key).expect("decrypt");
            assert_eq!(out.content, content);
            assert_eq!(out.content_type, content_type);
            assert_eq!(out.size, content.len() as u64);
        }
    }

    #[test]
    fn test_sentinels_hide_type_and_preview() {
        let row = encrypt(b"secret", "image/png", &key()).expect("encrypt");
        assert_eq!(row.content_type, ENCRYPTED_SENTINEL);
        assert_eq!(row.preview, ENCRYPTED_SENTINEL);
        assert!(!row.encrypted_meta.is_empty());
        assert!(!row
            .encrypted_meta
            .windows(b"image/png".len())
            .any(|w| w == b"image/png"));
    }

    #[test]
    fn test_hash_stable_ciphertext_fresh() {
        let key = key();
        let a = encrypt(b"same content", "text/plain", &key).expect("encrypt");
        let b = encrypt(b"same content", "text/plain", &key).expect("encrypt");
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.size, b.size);
        assert_ne!(a.content, b.content);
        assert_ne!(a.encrypted_meta, b.encrypted_meta);
    }

    #[test]
    fn test_hash_is_keyed() {
        let row = encrypt(b"guess me", "text/plain", &key()).expect("encrypt");
        assert_ne!(row.hash, digest::plain_digest(b"guess me"));
    }

    #[test]
    fn test_size_masked() {
        let content = vec![b'x'; 1234];
        let row = encrypt(&content, "text/plain", &key()).expect("encrypt");
        let mask = digest::size_mask(&key(), &row.hash).expect("mask");
        assert_eq!(row.size, 1234 ^ u64::from(mask));
    }

    #[test]
    fn test_missing_meta_defaults_to_plain_text() {
        let key = key();
        let mut row = encrypt(b"legacy", "image/png", &key).expect("encrypt");
        row.encrypted_meta.clear();
        let out = decrypt_row(&row, &key).expect("decrypt");
        assert_eq!(out.content, b"legacy");
        assert_eq!(out.content_type, PLAIN_TEXT_TYPE);
    }

    #[test]
    fn test_schema_v1_row_decrypts() {
        // A v1 row: GCM blob with no sealed metadata, HMAC hash, masked size.
        let key = Key::from_bytes([0u8; 32]);
        let plaintext = [0u8; 16];
        let mut content = vec![0u8; aead::NONCE_SIZE];
        content.extend(hex::decode("cea7403d4d606b6e074ec5d3baf39d18").expect("hex"));
        content.extend(hex::decode("d0d1c8a799996bf0265b98b5d48ab919").expect("hex"));
        let hash = digest::keyed_digest(&key, &plaintext).expect("digest");
        let size = digest::mask_size(16, &key, &hash).expect("mask");

        let out = decrypt(&content, &[], &hash, size, &key).expect("decrypt");
        assert_eq!(out.content, plaintext);
        assert_eq!(out.content_type, PLAIN_TEXT_TYPE);
        assert_eq!(out.size, 16);
    }

    #[test]
    fn test_wrong_key_fails() {
        let row = encrypt(b"data", "text/plain", &key()).expect("encrypt");
        let other = Key::from_bytes([0x01u8; 32]);
        assert!(matches!(
            decrypt_row(&row, &other),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_meta_fails() {
        let key = key();
        let mut row = encrypt(b"data", "text/plain", &key).expect("encrypt");
        if let Some(byte) = row.encrypted_meta.last_mut() {
            *byte ^= 0x01;
        }
        assert!(matches!(
            decrypt_row(&row, &key),
            Err(CryptoError::DecryptionFailed)
        ));
    }
}
