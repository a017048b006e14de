//! The history store.
//!
//! ## Save path
//!
//! 1. Pick the key: encryption on, a provider attached and a key obtainable.
//!    Otherwise the clip is stored in the clear.
//! 2. Compute the dedup digest (keyed when encrypting) and compare it with
//!    the newest row only.
//! 3. Insert and evict beyond `max_entries` in one transaction.
//! 4. Reclaim freed pages if eviction deleted anything.

use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, TransactionBehavior};
use teeclip_crypto::kdf::{self, SALT_SIZE};
use teeclip_crypto::{digest, row, Key};
use teeclip_db::queries::clips::{self, ClipRow, EncryptionColumns, NewClip};
use teeclip_db::queries::metadata;
use teeclip_db::DbError;
use teeclip_keys::{KeyProvider, TrustModel};
use tracing::{debug, info, warn};

use crate::preview::make_preview;
use crate::{
    Clip, ClipEntry, ClipSource, Direction, EncryptionState, HistoryConfig, HistoryError,
    Result, Selector,
};

/// Handle to an open history database.
pub struct HistoryStore {
    conn: Connection,
    config: HistoryConfig,
    provider: Option<Box<dyn KeyProvider>>,
}

impl HistoryStore {
    /// Open or create the store at `path`, running pending migrations.
    pub fn open(path: &Path, config: HistoryConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = teeclip_db::open(path)?;
        Ok(Self::with_connection(conn, config))
    }

    /// Open a throwaway in-memory store.
    pub fn open_memory(config: HistoryConfig) -> Result<Self> {
        let conn = teeclip_db::open_memory()?;
        Ok(Self::with_connection(conn, config))
    }

    fn with_connection(conn: Connection, config: HistoryConfig) -> Self {
        Self {
            conn,
            config,
            provider: None,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Raw connection, for inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn set_key_provider(&mut self, provider: Box<dyn KeyProvider>) {
        self.provider = Some(provider);
    }

    pub fn key_provider(&self) -> Option<&dyn KeyProvider> {
        self.provider.as_deref()
    }

    /// Store a clip. Returns `None` if it duplicates the newest clip.
    pub fn save(
        &mut self,
        content: &[u8],
        content_type: &str,
        source: ClipSource,
    ) -> Result<Option<i64>> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let key = self.save_key()?;

        let plain_preview;
        let encrypted_row;
        let new_clip = match &key {
            Some(key) => {
                encrypted_row = row::encrypt(content, content_type, key)?;
                NewClip {
                    timestamp: &timestamp,
                    content_type: &encrypted_row.content_type,
                    content: &encrypted_row.content,
                    size: encrypted_row.size,
                    hash: &encrypted_row.hash,
                    preview: &encrypted_row.preview,
                    source: source.as_str(),
                    encrypted: true,
                    encrypted_meta: &encrypted_row.encrypted_meta,
                }
            }
            None => {
                plain_preview = (
                    digest::plain_digest(content),
                    make_preview(content, self.config.preview_length),
                );
                NewClip {
                    timestamp: &timestamp,
                    content_type,
                    content,
                    size: content.len() as u64,
                    hash: &plain_preview.0,
                    preview: &plain_preview.1,
                    source: source.as_str(),
                    encrypted: false,
                    encrypted_meta: &[],
                }
            }
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if clips::latest_hash(&tx)?.as_deref() == Some(new_clip.hash) {
            debug!("Duplicate of the most recent clip, not saved");
            return Ok(None);
        }

        let id = clips::insert(&tx, &new_clip)?;
        let first_encrypted = new_clip.encrypted
            && metadata::get_opt(&tx, metadata::ENCRYPTION_TRUST_MODEL_KEY)?.is_none();
        if first_encrypted {
            metadata::set_bool(&tx, metadata::ENCRYPTION_ENABLED_KEY, true)?;
            metadata::set(
                &tx,
                metadata::ENCRYPTION_TRUST_MODEL_KEY,
                self.config.trust_model.as_str(),
            )?;
        }
        let evicted = clips::evict_beyond(&tx, self.config.max_entries)?;
        tx.commit()?;

        if evicted > 0 {
            debug!("Evicted {evicted} clip(s) beyond max_entries");
            teeclip_db::reclaim(&self.conn);
        }
        Ok(Some(id))
    }

    /// The `limit` most recent clips, newest first.
    ///
    /// Encrypted clips are shown decrypted when a key is available and with
    /// their stored placeholders otherwise.
    pub fn list(&self, limit: usize) -> Result<Vec<ClipEntry>> {
        let rows = clips::list_recent(&self.conn, limit)?;
        let key = if rows.iter().any(|r| r.encrypted) {
            self.read_key()?
        } else {
            None
        };

        rows.into_iter()
            .enumerate()
            .map(|(index, row)| {
                self.open_row(index + 1, row, key.as_ref())
                    .map(|clip| clip.entry)
            })
            .collect()
    }

    /// The clip at 1-based recency `position`.
    pub fn get(&self, position: usize) -> Result<Clip> {
        let row = match clips::get_at(&self.conn, position)? {
            Some(row) => row,
            None => {
                let total = clips::count(&self.conn)?;
                return Err(HistoryError::NotFound(format!(
                    "clip #{position} (history holds {total})"
                )));
            }
        };
        let key = if row.encrypted { self.read_key()? } else { None };
        self.open_row(position, row, key.as_ref())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(clips::count(&self.conn)?)
    }

    /// Delete the selected clips, or every clip when `selector` is `None`.
    ///
    /// Positions are resolved against the ordering at call time. Returns the
    /// number of clips deleted.
    pub fn clear(&mut self, selector: Option<&Selector>) -> Result<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted = match selector {
            None => clips::delete_all(&tx)?,
            Some(selector) => {
                let ids = clips::ids_newest_first(&tx)?;
                clips::delete_ids(&tx, &selector.resolve(&ids))?
            }
        };
        tx.commit()?;

        if deleted > 0 {
            info!("Cleared {deleted} clip(s)");
            teeclip_db::reclaim(&self.conn);
        }
        Ok(deleted)
    }

    /// Encrypt every plaintext clip, or decrypt every encrypted one, in place.
    ///
    /// All or nothing: the first failure rolls the whole pass back. Returns
    /// the number of clips rewritten.
    pub fn transform_all(&mut self, direction: Direction, key: &Key) -> Result<usize> {
        let configured = self.config.trust_model;
        let preview_length = self.config.preview_length;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rewritten = match direction {
            Direction::Encrypt => {
                let already_encrypted = clips::list_by_encryption(&tx, true)?;
                if let Some(sample) = already_encrypted.first() {
                    if let Some(recorded) = recorded_trust_model(&tx)? {
                        if recorded != configured {
                            return Err(HistoryError::TrustModelMismatch {
                                recorded,
                                configured,
                            });
                        }
                    }
                    // New rows must share the key of the existing ones.
                    decrypt_clip(sample, key)?;
                }

                let rows = clips::list_by_encryption(&tx, false)?;
                for clip in &rows {
                    let sealed = row::encrypt(&clip.content, &clip.content_type, key)?;
                    clips::update_encryption(
                        &tx,
                        clip.id,
                        &EncryptionColumns {
                            content_type: &sealed.content_type,
                            content: &sealed.content,
                            size: sealed.size,
                            hash: &sealed.hash,
                            preview: &sealed.preview,
                            encrypted: true,
                            encrypted_meta: &sealed.encrypted_meta,
                        },
                    )?;
                }
                metadata::set_bool(&tx, metadata::ENCRYPTION_ENABLED_KEY, true)?;
                metadata::set(&tx, metadata::ENCRYPTION_TRUST_MODEL_KEY, configured.as_str())?;
                rows.len()
            }
            Direction::Decrypt => {
                let rows = clips::list_by_encryption(&tx, true)?;
                for clip in &rows {
                    let plain = decrypt_clip(clip, key)?;
                    let hash = digest::plain_digest(&plain.content);
                    let preview = make_preview(&plain.content, preview_length);
                    clips::update_encryption(
                        &tx,
                        clip.id,
                        &EncryptionColumns {
                            content_type: &plain.content_type,
                            content: &plain.content,
                            size: plain.size,
                            hash: &hash,
                            preview: &preview,
                            encrypted: false,
                            encrypted_meta: &[],
                        },
                    )?;
                }
                metadata::set_bool(&tx, metadata::ENCRYPTION_ENABLED_KEY, false)?;
                metadata::delete(&tx, metadata::ENCRYPTION_TRUST_MODEL_KEY)?;
                metadata::delete(&tx, metadata::ENCRYPTION_SALT_KEY)?;
                rows.len()
            }
        };
        tx.commit()?;

        info!("{direction:?}: rewrote {rewritten} clip(s)");
        teeclip_db::reclaim(&self.conn);
        Ok(rewritten)
    }

    /// Encrypt every plaintext clip with the attached provider's key.
    ///
    /// A provider without custody yet generates its key first, unless some
    /// clip is already encrypted.
    pub fn encrypt_all(&mut self) -> Result<usize> {
        let key = self.writing_key()?;
        self.transform_all(Direction::Encrypt, &key)
    }

    /// Decrypt every encrypted clip with the attached provider's key.
    pub fn decrypt_all(&mut self) -> Result<usize> {
        let key = self.active_key()?;
        self.transform_all(Direction::Decrypt, &key)
    }

    /// Salt for the password trust model, created on first request.
    pub fn password_salt(&self) -> Result<[u8; SALT_SIZE]> {
        if let Some(stored) = metadata::get_opt(&self.conn, metadata::ENCRYPTION_SALT_KEY)? {
            let bytes = hex::decode(stored.trim()).map_err(|e| {
                HistoryError::from(DbError::Serialization(format!("encryption_salt: {e}")))
            })?;
            return <[u8; SALT_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
                HistoryError::from(DbError::Serialization(format!(
                    "encryption_salt holds {} bytes, expected {SALT_SIZE}",
                    bytes.len()
                )))
            });
        }

        let salt = kdf::generate_salt();
        metadata::set(
            &self.conn,
            metadata::ENCRYPTION_SALT_KEY,
            &hex::encode(salt),
        )?;
        Ok(salt)
    }

    pub fn encryption_state(&self) -> Result<EncryptionState> {
        Ok(EncryptionState {
            enabled: metadata::get_bool(&self.conn, metadata::ENCRYPTION_ENABLED_KEY, false)?,
            trust_model: recorded_trust_model(&self.conn)?,
            encrypted_rows: clips::count_encrypted(&self.conn)?,
            total_rows: clips::count(&self.conn)?,
        })
    }

    fn active_key(&self) -> Result<Key> {
        let provider = self.provider.as_deref().ok_or_else(no_provider)?;
        Ok(provider.obtain_key()?)
    }

    /// Key for writing encrypted rows.
    ///
    /// A new key is generated only while the provider holds no custody and
    /// no clip is encrypted, so rows are never split across two keys.
    fn writing_key(&self) -> Result<Key> {
        let provider = self.provider.as_deref().ok_or_else(no_provider)?;
        if provider.has_key() {
            return Ok(provider.obtain_key()?);
        }
        let encrypted = clips::count_encrypted(&self.conn)?;
        if encrypted > 0 {
            return Err(HistoryError::KeyUnavailable(format!(
                "{} holds no key for {encrypted} encrypted clip(s)",
                provider.name()
            )));
        }
        info!("Generating a new key with {}", provider.name());
        Ok(provider.generate_key()?)
    }

    /// Key for displaying encrypted clips. `None` when custody is missing.
    fn read_key(&self) -> Result<Option<Key>> {
        match self.active_key() {
            Ok(key) => Ok(Some(key)),
            Err(HistoryError::KeyUnavailable(reason)) => {
                debug!("Showing encrypted clips sealed: {reason}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Key for a new clip, or `None` to store it in the clear.
    fn save_key(&self) -> Result<Option<Key>> {
        if !self.config.encryption.is_on() {
            return Ok(None);
        }

        if let Some(recorded) = recorded_trust_model(&self.conn)? {
            if recorded != self.config.trust_model && clips::count_encrypted(&self.conn)? > 0 {
                warn!(
                    "History is encrypted under the {recorded} trust model, not {}; saving plaintext",
                    self.config.trust_model
                );
                return Ok(None);
            }
        }

        match self.writing_key() {
            Ok(key) => Ok(Some(key)),
            Err(e) => {
                warn!("Encryption is on but no key is available ({e}); saving plaintext");
                Ok(None)
            }
        }
    }

    fn open_row(&self, position: usize, clip: ClipRow, key: Option<&Key>) -> Result<Clip> {
        let source = clip.source.parse().unwrap_or_default();

        if let (true, Some(key)) = (clip.encrypted, key) {
            let plain = decrypt_clip(&clip, key)?;
            let preview = make_preview(&plain.content, self.config.preview_length);
            return Ok(Clip {
                entry: ClipEntry {
                    position,
                    id: clip.id,
                    timestamp: clip.timestamp,
                    content_type: plain.content_type,
                    size: plain.size,
                    preview,
                    source,
                    encrypted: true,
                    sealed: false,
                },
                content: plain.content,
            });
        }

        Ok(Clip {
            entry: ClipEntry {
                position,
                id: clip.id,
                timestamp: clip.timestamp,
                content_type: clip.content_type,
                size: clip.size,
                preview: clip.preview,
                source,
                encrypted: clip.encrypted,
                sealed: clip.encrypted,
            },
            content: clip.content,
        })
    }
}

fn decrypt_clip(clip: &ClipRow, key: &Key) -> Result<row::DecryptedRow> {
    Ok(row::decrypt(
        &clip.content,
        &clip.encrypted_meta,
        &clip.hash,
        clip.size,
        key,
    )?)
}

fn recorded_trust_model(conn: &Connection) -> Result<Option<TrustModel>> {
    Ok(metadata::get_opt(conn, metadata::ENCRYPTION_TRUST_MODEL_KEY)?
        .and_then(|value| value.parse().ok()))
}

fn no_provider() -> HistoryError {
    HistoryError::KeyUnavailable("no key provider attached".to_string())
}
