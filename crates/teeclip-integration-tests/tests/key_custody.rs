//! Integration test: key custody under both trust models.
//!
//! 1. Key file custody survives process restarts and is owner-only
//! 2. Password custody derives the same key from the same password and salt
//! 3. A wrong password surfaces as a decryption failure, never as garbage
//! 4. Switching trust models requires decrypting first
//! 5. Lost custody never produces a second key for the same store
//!
//! Password tests use reduced PBKDF2 iterations for speed.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use teeclip_history::{ClipSource, HistoryConfig, HistoryError, HistoryStore};
use teeclip_keys::file::FileKeyProvider;
use teeclip_keys::password::{PasswordKeyProvider, PasswordPrompt};
use teeclip_keys::{KeyError, KeyProvider, TrustModel};

const TEST_ITERATIONS: u32 = 1_000;

/// Prompt that replays `answers` in order and records every prompt shown.
fn scripted(answers: &[&str]) -> (Box<dyn PasswordPrompt>, Arc<Mutex<Vec<String>>>) {
    let queue = Arc::new(Mutex::new(
        answers.iter().rev().map(|a| a.to_string()).collect::<Vec<_>>(),
    ));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_prompt = Arc::clone(&seen);
    let prompt: Box<dyn PasswordPrompt> = Box::new(move |text: &str| -> io::Result<String> {
        seen_by_prompt
            .lock()
            .expect("lock prompts")
            .push(text.to_string());
        queue
            .lock()
            .expect("lock answers")
            .pop()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
    });
    (prompt, seen)
}

fn password_provider(store: &HistoryStore, answers: &[&str]) -> Box<dyn KeyProvider> {
    let salt = store.password_salt().expect("salt");
    let (prompt, _) = scripted(answers);
    Box::new(PasswordKeyProvider::with_iterations(
        salt,
        prompt,
        TEST_ITERATIONS,
    ))
}

fn open(dir: &Path, config: HistoryConfig) -> HistoryStore {
    HistoryStore::open(&dir.join("history.db"), config).expect("open history store")
}

#[test]
fn key_file_survives_restart() {
    let dir = tempfile::TempDir::new().expect("temp dir");

    let first = FileKeyProvider::in_data_dir(dir.path());
    assert!(!first.has_key());
    assert!(matches!(
        first.obtain_key(),
        Err(KeyError::KeyUnavailable(_))
    ));
    let key = first.generate_key().expect("first-time setup creates the key");
    assert!(first.has_key());
    assert_eq!(
        std::fs::metadata(first.path()).expect("stat key file").len(),
        32
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(first.path())
            .expect("stat key file")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600, "key file must be owner-only");
    }

    let second = FileKeyProvider::in_data_dir(dir.path());
    assert_eq!(second.obtain_key().expect("reload"), key);

    second.wipe().expect("wipe");
    assert!(!dir.path().join("key.bin").exists());
}

#[test]
fn corrupt_key_file_is_reported() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("key.bin"), b"short").expect("write");
    let provider = FileKeyProvider::in_data_dir(dir.path());
    assert!(matches!(
        provider.obtain_key(),
        Err(KeyError::CorruptKey(_))
    ));
}

#[test]
fn password_roundtrip_and_wrong_password() {
    let dir = tempfile::TempDir::new().expect("temp dir");

    // =========================================================
    // Step 1: Encrypt under a password (entered twice)
    // =========================================================
    {
        let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::Password));
        store
            .save(b"password protected", "text/plain", ClipSource::Manual)
            .expect("save");

        let salt = store.password_salt().expect("salt");
        let (prompt, seen) = scripted(&["hunter2", "hunter2"]);
        let provider = PasswordKeyProvider::with_iterations(salt, prompt, TEST_ITERATIONS);
        provider.generate_key().expect("confirmed password");
        store.set_key_provider(Box::new(provider));
        assert_eq!(store.encrypt_all().expect("encrypt"), 1);
        assert_eq!(
            seen.lock().expect("lock").len(),
            2,
            "key is cached after confirmation"
        );
    }

    // =========================================================
    // Step 2: Wrong password fails authentication
    // =========================================================
    {
        let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::Password));
        let provider = password_provider(&store, &["hunter3"]);
        store.set_key_provider(provider);
        assert!(matches!(store.list(10), Err(HistoryError::DecryptionFailed)));
        assert!(matches!(store.get(1), Err(HistoryError::DecryptionFailed)));
    }

    // =========================================================
    // Step 3: Right password in a new process decrypts
    // =========================================================
    let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::Password));
    let provider = password_provider(&store, &["hunter2"]);
    store.set_key_provider(provider);
    let clip = store.get(1).expect("get");
    assert_eq!(clip.content, b"password protected");
    assert_eq!(clip.entry.source, ClipSource::Manual);

    let salt_before = store.password_salt().expect("salt");
    assert_eq!(store.decrypt_all().expect("decrypt"), 1);
    let state = store.encryption_state().expect("state");
    assert_eq!(state.trust_model, None);
    assert_ne!(
        store.password_salt().expect("fresh salt"),
        salt_before,
        "decrypting discards the old salt"
    );
}

#[test]
fn password_confirmation_mismatch() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let store = open(dir.path(), HistoryConfig::encrypted(TrustModel::Password));
    let provider = password_provider(&store, &["one", "two"]);
    assert!(matches!(
        provider.generate_key(),
        Err(KeyError::PasswordMismatch)
    ));
}

#[test]
fn switching_trust_model_requires_decrypt() {
    let dir = tempfile::TempDir::new().expect("temp dir");

    {
        let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::OsSession));
        store.set_key_provider(Box::new(FileKeyProvider::in_data_dir(dir.path())));
        store
            .save(b"os session clip", "text/plain", ClipSource::Pipe)
            .expect("save");
        assert_eq!(store.encryption_state().expect("state").encrypted_rows, 1);
    }

    let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::Password));
    let provider = password_provider(&store, &["pw"]);
    store.set_key_provider(provider);

    // Saving under the other model keeps the new clip in the clear.
    store
        .save(b"while mismatched", "text/plain", ClipSource::Pipe)
        .expect("save");
    let state = store.encryption_state().expect("state");
    assert_eq!((state.encrypted_rows, state.total_rows), (1, 2));

    assert!(matches!(
        store.encrypt_all(),
        Err(HistoryError::TrustModelMismatch {
            recorded: TrustModel::OsSession,
            configured: TrustModel::Password,
        })
    ));
}

#[test]
fn lost_key_file_is_not_replaced() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let key_path = dir.path().join("key.bin");

    // =========================================================
    // Step 1: One clip encrypted under the key file
    // =========================================================
    {
        let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::OsSession));
        store.set_key_provider(Box::new(FileKeyProvider::in_data_dir(dir.path())));
        store
            .save(b"before the loss", "text/plain", ClipSource::Pipe)
            .expect("save");
    }
    let original_key = std::fs::read(&key_path).expect("read key file");
    std::fs::remove_file(&key_path).expect("lose key file");

    // =========================================================
    // Step 2: Reads show placeholders and create nothing
    // =========================================================
    let mut store = open(dir.path(), HistoryConfig::encrypted(TrustModel::OsSession));
    store.set_key_provider(Box::new(FileKeyProvider::in_data_dir(dir.path())));
    let entries = store.list(10).expect("list");
    assert!(entries[0].sealed);
    assert!(store.get(1).expect("get").entry.sealed);
    assert!(!key_path.exists(), "a read must not create a key");

    // =========================================================
    // Step 3: Writes refuse to start a second key
    // =========================================================
    store
        .save(b"after the loss", "text/plain", ClipSource::Pipe)
        .expect("save");
    let state = store.encryption_state().expect("state");
    assert_eq!((state.encrypted_rows, state.total_rows), (1, 2));
    assert!(matches!(
        store.encrypt_all(),
        Err(HistoryError::KeyUnavailable(_))
    ));
    assert!(matches!(
        store.decrypt_all(),
        Err(HistoryError::KeyUnavailable(_))
    ));
    assert!(!key_path.exists());

    // =========================================================
    // Step 4: Restoring the key file recovers everything
    // =========================================================
    std::fs::write(&key_path, &original_key).expect("restore key file");
    store.set_key_provider(Box::new(FileKeyProvider::in_data_dir(dir.path())));
    assert_eq!(store.decrypt_all().expect("decrypt"), 1);
    assert_eq!(store.get(2).expect("get").content, b"before the loss");
}
