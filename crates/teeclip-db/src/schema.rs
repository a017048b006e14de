//! SQL schema definitions.

/// Key/value table describing the store itself. Exists before any migration.
pub const METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Clip table as introduced in schema v1.
///
/// `sensitive` is a per-row flag v1 carried but never used; v2 drops it.
pub const CLIPS_V1: &str = r#"
CREATE TABLE IF NOT EXISTS clips (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp    TEXT NOT NULL,
    content_type TEXT NOT NULL DEFAULT 'text/plain',
    content      BLOB NOT NULL,
    size         INTEGER NOT NULL,
    hash         TEXT NOT NULL,
    preview      TEXT NOT NULL DEFAULT '',
    source       TEXT NOT NULL DEFAULT 'pipe',
    encrypted    INTEGER NOT NULL DEFAULT 0,
    sensitive    INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_clips_hash ON clips(hash);
CREATE INDEX IF NOT EXISTS idx_clips_timestamp ON clips(timestamp DESC);
"#;

/// v2: sealed per-row metadata (at minimum the real content type).
pub const ADD_ENCRYPTED_META: &str =
    "ALTER TABLE clips ADD COLUMN encrypted_meta BLOB NOT NULL DEFAULT x''";

/// v2: the unused sensitivity flag goes away.
pub const DROP_SENSITIVE: &str = "ALTER TABLE clips DROP COLUMN sensitive";
