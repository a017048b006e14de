//! Clip table query functions.
//!
//! Recency is always `ORDER BY id DESC`; position 1 is the newest row.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::Result;

const CLIP_COLUMNS: &str = "id, timestamp, content_type, content, size, hash, preview,
                            source, encrypted, encrypted_meta";

/// A raw clip row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRow {
    pub id: i64,
    pub timestamp: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub size: u64,
    pub hash: String,
    pub preview: String,
    pub source: String,
    pub encrypted: bool,
    pub encrypted_meta: Vec<u8>,
}

/// Columns for a new row.
#[derive(Debug, Clone)]
pub struct NewClip<'a> {
    pub timestamp: &'a str,
    pub content_type: &'a str,
    pub content: &'a [u8],
    pub size: u64,
    pub hash: &'a str,
    pub preview: &'a str,
    pub source: &'a str,
    pub encrypted: bool,
    pub encrypted_meta: &'a [u8],
}

/// Columns rewritten together when a row is encrypted or decrypted in place.
#[derive(Debug, Clone)]
pub struct EncryptionColumns<'a> {
    pub content_type: &'a str,
    pub content: &'a [u8],
    pub size: u64,
    pub hash: &'a str,
    pub preview: &'a str,
    pub encrypted: bool,
    pub encrypted_meta: &'a [u8],
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ClipRow> {
    Ok(ClipRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        content_type: row.get(2)?,
        content: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        hash: row.get(5)?,
        preview: row.get(6)?,
        source: row.get(7)?,
        encrypted: row.get(8)?,
        encrypted_meta: row.get(9)?,
    })
}

/// Insert a clip, returning its id.
pub fn insert(conn: &Connection, clip: &NewClip<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO clips
         (timestamp, content_type, content, size, hash, preview, source,
          encrypted, encrypted_meta)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            clip.timestamp,
            clip.content_type,
            clip.content,
            clip.size as i64,
            clip.hash,
            clip.preview,
            clip.source,
            clip.encrypted,
            clip.encrypted_meta,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Dedup digest of the most recent row.
pub fn latest_hash(conn: &Connection) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT hash FROM clips ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?)
}

/// Delete every row not among the `max_entries` newest. Returns rows deleted.
///
/// `max_entries == 0` means unbounded.
pub fn evict_beyond(conn: &Connection, max_entries: u32) -> Result<usize> {
    if max_entries == 0 {
        return Ok(0);
    }
    let deleted = conn.execute(
        "DELETE FROM clips WHERE id NOT IN (
             SELECT id FROM clips ORDER BY id DESC LIMIT ?1
         )",
        [max_entries],
    )?;
    Ok(deleted)
}

/// The `limit` most recent rows, newest first.
pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<ClipRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CLIP_COLUMNS} FROM clips ORDER BY id DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit as i64], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Row at 1-based recency `position`, if there is one.
pub fn get_at(conn: &Connection, position: usize) -> Result<Option<ClipRow>> {
    if position == 0 {
        return Ok(None);
    }
    Ok(conn
        .query_row(
            &format!("SELECT {CLIP_COLUMNS} FROM clips ORDER BY id DESC LIMIT 1 OFFSET ?1"),
            [(position - 1) as i64],
            map_row,
        )
        .optional()?)
}

/// Every row with the given encryption state, oldest first.
pub fn list_by_encryption(conn: &Connection, encrypted: bool) -> Result<Vec<ClipRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CLIP_COLUMNS} FROM clips WHERE encrypted = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt
        .query_map([encrypted], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All ids in recency order (newest first).
pub fn ids_newest_first(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM clips ORDER BY id DESC")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Rewrite the encryption-related columns of one row.
pub fn update_encryption(conn: &Connection, id: i64, cols: &EncryptionColumns<'_>) -> Result<()> {
    conn.execute(
        "UPDATE clips
         SET content_type = ?1, content = ?2, size = ?3, hash = ?4, preview = ?5,
             encrypted = ?6, encrypted_meta = ?7
         WHERE id = ?8",
        rusqlite::params![
            cols.content_type,
            cols.content,
            cols.size as i64,
            cols.hash,
            cols.preview,
            cols.encrypted,
            cols.encrypted_meta,
            id,
        ],
    )?;
    Ok(())
}

/// Delete rows by id. Returns rows deleted.
pub fn delete_ids(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut stmt = conn.prepare("DELETE FROM clips WHERE id = ?1")?;
    let mut deleted = 0;
    for id in ids {
        deleted += stmt.execute([id])?;
    }
    Ok(deleted)
}

/// Delete every row. Returns rows deleted.
pub fn delete_all(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM clips", [])?)
}

pub fn count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM clips", [], |row| row.get(0))?;
    Ok(n as usize)
}

/// Number of rows currently encrypted.
pub fn count_encrypted(conn: &Connection) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM clips WHERE encrypted = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}
