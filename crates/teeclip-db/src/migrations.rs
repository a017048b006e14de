//! Database migration system.
//!
//! Schema version stored in `metadata.schema_version`. Migrations are an
//! ordered list of forward-only steps. Each step runs in its own transaction
//! together with the version bump, and checks the live schema before
//! altering it, so applying a step twice is a no-op.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::queries::metadata;
use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// One schema step.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    apply: fn(&Connection) -> Result<()>,
}

/// All migrations, in version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create clips table",
        apply: migrate_v1,
    },
    Migration {
        version: 2,
        name: "add encrypted_meta, drop sensitive",
        apply: migrate_v2,
    },
];

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    run_to(conn, SCHEMA_VERSION)
}

/// Run pending migrations up to and including `target`.
pub fn run_to(conn: &Connection, target: u32) -> Result<()> {
    conn.execute_batch(schema::METADATA_TABLE)?;

    let current_version = current_version(conn)?;
    if current_version > SCHEMA_VERSION {
        return Err(DbError::SchemaMigrationFailed(format!(
            "database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version && m.version <= target)
    {
        tracing::info!(
            "Running migration to v{} ({})",
            migration.version,
            migration.name
        );
        apply_step(conn, migration, false).map_err(|e| step_failed(migration, e))?;
    }

    Ok(())
}

/// Re-apply a single step regardless of the recorded version.
///
/// Steps are idempotent, so on an already-migrated store this changes nothing.
pub fn reapply(conn: &Connection, version: u32) -> Result<()> {
    let migration = MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .ok_or_else(|| {
            DbError::SchemaMigrationFailed(format!("unknown migration version: {version}"))
        })?;
    apply_step(conn, migration, true).map_err(|e| step_failed(migration, e))
}

/// Read the recorded schema version. A store without one is version 0.
pub fn current_version(conn: &Connection) -> Result<u32> {
    match metadata::get(conn, metadata::SCHEMA_VERSION_KEY) {
        Ok(value) => value.trim().parse().map_err(|_| {
            DbError::SchemaMigrationFailed(format!("unreadable schema version '{value}'"))
        }),
        Err(DbError::NotFound(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

fn apply_step(conn: &Connection, migration: &Migration, force: bool) -> Result<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    // Another process may have migrated while we waited for the write lock.
    let recorded = current_version(&tx)?;
    if recorded >= migration.version && !force {
        return Ok(());
    }

    (migration.apply)(&tx)?;
    if recorded < migration.version {
        metadata::set(
            &tx,
            metadata::SCHEMA_VERSION_KEY,
            &migration.version.to_string(),
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn step_failed(migration: &Migration, err: DbError) -> DbError {
    match err {
        DbError::SchemaMigrationFailed(_) => err,
        other => DbError::SchemaMigrationFailed(format!(
            "v{} ({}): {other}",
            migration.version, migration.name
        )),
    }
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::CLIPS_V1)?;
    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value)
         VALUES (?1, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))",
        [metadata::CREATED_AT_KEY],
    )?;
    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    if !has_column(conn, "clips", "encrypted_meta")? {
        conn.execute_batch(schema::ADD_ENCRYPTED_META)?;
    }
    if has_column(conn, "clips", "sensitive")? {
        conn.execute_batch(schema::DROP_SENSITIVE)?;
    }
    Ok(())
}

/// Whether `table` currently has a column called `column`.
pub fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        rusqlite::params![table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
