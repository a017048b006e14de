//! Raw key file custody, the headless fallback for the OS-session trust model.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use teeclip_crypto::key::KEY_SIZE;
use teeclip_crypto::Key;
use tracing::info;

use crate::{KeyCache, KeyError, KeyProvider, Result, KEY_FILE_NAME};

/// Key stored as 32 raw bytes in a file readable only by its owner.
pub struct FileKeyProvider {
    path: PathBuf,
    cache: KeyCache,
}

impl FileKeyProvider {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cache: KeyCache::default(),
        }
    }

    /// Provider for `<data_dir>/key.bin`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(KEY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_key(&self) -> Result<Key> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(KeyError::KeyUnavailable(format!(
                    "key file not found: {}",
                    self.path.display()
                )))
            }
            Err(err) => return Err(KeyError::Io(err)),
        };
        if bytes.len() != KEY_SIZE {
            return Err(KeyError::CorruptKey(format!(
                "{} holds {} bytes, expected {KEY_SIZE}",
                self.path.display(),
                bytes.len()
            )));
        }
        Ok(Key::from_slice(&bytes)?)
    }
}

impl KeyProvider for FileKeyProvider {
    fn name(&self) -> &'static str {
        "key-file"
    }

    fn has_key(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the key file. A missing file is `KeyUnavailable`; only
    /// [`generate_key`](KeyProvider::generate_key) creates one.
    fn obtain_key(&self) -> Result<Key> {
        self.cache.get_or_load(|| self.read_key())
    }

    fn generate_key(&self) -> Result<Key> {
        let key = Key::generate();
        write_private(&self.path, key.as_bytes())?;
        info!("Created key file at {}", self.path.display());
        self.cache.set(&key);
        Ok(key)
    }

    fn wipe(&self) -> Result<()> {
        self.cache.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(KeyError::Io(err)),
        }
    }
}

/// Write `bytes` atomically to `path` with owner-only permissions.
pub(crate) fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    match fs::remove_file(&temp_path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(KeyError::Io(err)),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}
