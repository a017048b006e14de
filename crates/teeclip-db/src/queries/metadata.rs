//! Store metadata query functions.
//!
//! Unknown keys are left alone: older binaries must not reject stores written
//! by newer ones.

use rusqlite::Connection;

use crate::{DbError, Result};

pub const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const CREATED_AT_KEY: &str = "created_at";
pub const ENCRYPTION_ENABLED_KEY: &str = "encryption_enabled";
pub const ENCRYPTION_TRUST_MODEL_KEY: &str = "encryption_trust_model";
pub const ENCRYPTION_SALT_KEY: &str = "encryption_salt";

/// Get a metadata value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("metadata '{key}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Get a metadata value, or `None` if the key is absent.
pub fn get_opt(conn: &Connection, key: &str) -> Result<Option<String>> {
    match get(conn, key) {
        Ok(v) => Ok(Some(v)),
        Err(DbError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set a metadata value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Remove a metadata key. Removing an absent key is not an error.
pub fn delete(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM metadata WHERE key = ?1", [key])?;
    Ok(())
}

/// Get a metadata value as a boolean, defaulting to `default` if not found.
pub fn get_bool(conn: &Connection, key: &str, default: bool) -> Result<bool> {
    match get(conn, key) {
        Ok(v) => Ok(v == "true" || v == "1"),
        Err(DbError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

/// Set a boolean metadata value.
pub fn set_bool(conn: &Connection, key: &str, value: bool) -> Result<()> {
    set(conn, key, if value { "true" } else { "false" })
}
