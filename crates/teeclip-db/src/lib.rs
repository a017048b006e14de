//! # teeclip-db
//!
//! SQLite access layer for the clip history.
//! Manages the single database at `$TEECLIP_HOME/history.db`.
//!
//! ## Schema
//!
//! - WAL mode, so readers never block behind a saving process
//! - `secure_delete` on, so freed pages are zeroed as rows go away
//! - Timestamps are RFC 3339 UTC text
//! - Schema version stored in the `metadata` table under `schema_version`

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema migration failed: {0}")]
    SchemaMigrationFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the history database at the given path.
///
/// Configures pragmas and runs any pending migrations. A failed migration
/// yields no connection.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(Duration::from_millis(5000))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;
         PRAGMA secure_delete = ON;",
    )?;
    Ok(())
}

/// Rebuild the database file so deleted rows leave nothing in free pages.
///
/// Best effort: a busy database or a read-only file is not an error.
pub fn reclaim(conn: &Connection) {
    if let Err(e) = conn.execute_batch("VACUUM;") {
        tracing::debug!("VACUUM skipped: {e}");
    }
}
