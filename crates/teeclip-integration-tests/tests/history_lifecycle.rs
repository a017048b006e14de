//! Integration test: history store lifecycle on a real database file.
//!
//! Exercises save/dedup/eviction, selective clearing, the bulk
//! encrypt/decrypt pass and the reclaim of deleted content, reopening the
//! store between steps the way separate CLI invocations would.

use std::path::{Path, PathBuf};

use teeclip_crypto::row::ENCRYPTED_SENTINEL;
use teeclip_history::{ClipSource, HistoryConfig, HistoryError, HistoryStore, Selector};
use teeclip_keys::file::FileKeyProvider;
use teeclip_keys::TrustModel;

fn db_path(dir: &Path) -> PathBuf {
    dir.join("history.db")
}

fn open(dir: &Path, config: HistoryConfig) -> HistoryStore {
    HistoryStore::open(&db_path(dir), config).expect("open history store")
}

fn save(store: &mut HistoryStore, text: &str) -> Option<i64> {
    store
        .save(text.as_bytes(), "text/plain", ClipSource::Pipe)
        .expect("save should succeed")
}

fn previews(store: &HistoryStore) -> Vec<String> {
    store
        .list(100)
        .expect("list should succeed")
        .into_iter()
        .map(|e| e.preview)
        .collect()
}

#[test]
fn dedup_and_eviction_across_invocations() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let config = HistoryConfig {
        max_entries: 4,
        ..HistoryConfig::default()
    };

    // =========================================================
    // Step 1: Consecutive duplicates collapse into one row
    // =========================================================
    {
        let mut store = open(dir.path(), config.clone());
        assert!(save(&mut store, "alpha").is_some());
        assert!(save(&mut store, "alpha").is_none(), "duplicate of newest is skipped");
        assert!(save(&mut store, "beta").is_some());
        assert!(save(&mut store, "alpha").is_some(), "only the newest row is compared");
    }

    // =========================================================
    // Step 2: A later process sees the same history and evicts FIFO
    // =========================================================
    {
        let mut store = open(dir.path(), config.clone());
        assert_eq!(store.count().expect("count"), 3);
        for text in ["c1", "c2", "c3"] {
            save(&mut store, text);
        }
        assert_eq!(previews(&store), ["c3", "c2", "c1", "alpha"]);
    }

    // =========================================================
    // Step 3: Shrinking max_entries applies at the next save
    // =========================================================
    let mut store = open(
        dir.path(),
        HistoryConfig {
            max_entries: 2,
            ..config
        },
    );
    save(&mut store, "c4");
    assert_eq!(previews(&store), ["c4", "c3"]);
}

#[test]
fn selective_clear_resolves_positions_at_call_time() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let mut store = open(dir.path(), HistoryConfig::default());
    for i in 1..=10 {
        save(&mut store, &format!("clip {i}"));
    }

    // Positions: 1 = "clip 10" ... 10 = "clip 1"
    let selector = Selector::parse("2,4:6,40").expect("parse selector");
    assert_eq!(store.clear(Some(&selector)).expect("clear"), 4);
    assert_eq!(
        previews(&store),
        ["clip 10", "clip 8", "clip 4", "clip 3", "clip 2", "clip 1"]
    );

    // The same selector now names different clips.
    assert_eq!(store.clear(Some(&selector)).expect("clear"), 4);
    assert_eq!(previews(&store), ["clip 10", "clip 4"]);

    assert!(
        matches!(
            Selector::parse("3:1"),
            Err(teeclip_history::SelectorParseError::ReversedRange { .. })
        ),
        "malformed selectors never reach the store"
    );

    assert_eq!(store.clear(None).expect("clear all"), 2);
    assert_eq!(store.count().expect("count"), 0);
}

#[test]
fn encrypt_decrypt_roundtrip_with_key_file() {
    let dir = tempfile::TempDir::new().expect("temp dir");

    // =========================================================
    // Step 1: Plaintext history, then encrypt everything
    // =========================================================
    {
        let mut store = open(dir.path(), HistoryConfig::default());
        store
            .save(b"{\"k\": 1}", "application/json", ClipSource::Clipboard)
            .expect("save json");
        save(&mut store, "  multi\n  line  ");
        store.set_key_provider(Box::new(FileKeyProvider::in_data_dir(dir.path())));
        assert_eq!(store.encrypt_all().expect("encrypt all"), 2);
    }
    assert!(dir.path().join("key.bin").is_file(), "key file created on first use");

    // =========================================================
    // Step 2: Without a key the listing shows placeholders only
    // =========================================================
    {
        let store = open(dir.path(), HistoryConfig::default());
        for entry in store.list(10).expect("list") {
            assert!(entry.sealed);
            assert_eq!(entry.content_type, ENCRYPTED_SENTINEL);
            assert_eq!(entry.preview, ENCRYPTED_SENTINEL);
        }
    }

    // =========================================================
    // Step 3: A fresh provider over the same key file decrypts
    // =========================================================
    let mut store = open(
        dir.path(),
        HistoryConfig::encrypted(TrustModel::OsSession),
    );
    store.set_key_provider(Box::new(FileKeyProvider::in_data_dir(dir.path())));
    let entries = store.list(10).expect("list");
    assert_eq!(entries[0].preview, "multi line");
    assert_eq!(entries[1].content_type, "application/json");
    assert_eq!(entries[1].size, 8);
    assert_eq!(store.get(2).expect("get").content, b"{\"k\": 1}");

    // New saves are encrypted and still dedup against the newest row.
    save(&mut store, "fresh");
    assert!(save(&mut store, "fresh").is_none());
    let state = store.encryption_state().expect("state");
    assert_eq!((state.encrypted_rows, state.total_rows), (3, 3));
    assert_eq!(state.trust_model, Some(TrustModel::OsSession));

    // =========================================================
    // Step 4: Decrypt restores plaintext columns
    // =========================================================
    assert_eq!(store.decrypt_all().expect("decrypt all"), 3);
    let state = store.encryption_state().expect("state");
    assert!(!state.enabled);
    assert_eq!(state.encrypted_rows, 0);
    assert_eq!(previews(&store), ["fresh", "multi line", "{\"k\": 1}"]);
}

#[test]
fn corrupt_row_aborts_whole_decrypt_pass() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::OsSession));
    store.set_key_provider(Box::new(FileKeyProvider::in_data_dir(dir.path())));
    for text in ["one", "two", "three", "four"] {
        save(&mut store, text);
    }

    let snapshot = |store: &HistoryStore| -> Vec<(i64, Vec<u8>, String)> {
        let mut stmt = store
            .connection()
            .prepare("SELECT id, content, hash FROM clips ORDER BY id")
            .expect("prepare");
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .expect("query")
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        rows
    };

    // Replace the third row's blob with bytes that cannot authenticate.
    store
        .connection()
        .execute(
            "UPDATE clips SET content = zeroblob(40)
             WHERE id = (SELECT id FROM clips ORDER BY id LIMIT 1 OFFSET 2)",
            [],
        )
        .expect("corrupt third row");
    let before = snapshot(&store);

    let err = store.decrypt_all().expect_err("corrupt row must fail the pass");
    assert!(matches!(err, HistoryError::DecryptionFailed));
    assert_eq!(snapshot(&store), before, "no row was rewritten");
    assert_eq!(store.encryption_state().expect("state").encrypted_rows, 4);
}

#[test]
fn cleared_content_is_gone_from_database_file() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let needle = "needle-7f3a9c-should-not-survive";
    {
        let mut store = open(dir.path(), HistoryConfig::default());
        save(&mut store, needle);
        save(&mut store, "keep me");
        let selector = Selector::parse("2").expect("parse selector");
        assert_eq!(store.clear(Some(&selector)).expect("clear"), 1);
    }

    let bytes = std::fs::read(db_path(dir.path())).expect("read db file");
    let found = bytes
        .windows(needle.len())
        .any(|w| w == needle.as_bytes());
    assert!(!found, "deleted clip text must not remain in the file");

    let store = open(dir.path(), HistoryConfig::default());
    assert_eq!(previews(&store), ["keep me"]);
}
