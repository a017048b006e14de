//! Choosing the authoritative provider for the OS-session trust model.
//!
//! Custody files on disk decide, not configuration text:
//!
//! 1. `key.bin` exists → the key file is authoritative.
//! 2. `key.ref` exists → the platform credential facility is authoritative.
//! 3. Neither → use the facility if it answers, else fall back to `key.bin`
//!    (headless sessions, SSH logins, CI).

use std::path::Path;

use tracing::{debug, warn};

use crate::file::FileKeyProvider;
use crate::os_session;
use crate::KeyProvider;

/// Pick the provider that holds (or will hold) the store key in `data_dir`.
pub fn os_session_provider(data_dir: &Path) -> Box<dyn KeyProvider> {
    let file = FileKeyProvider::in_data_dir(data_dir);
    if file.has_key() {
        debug!("Using key file {}", file.path().display());
        return Box::new(file);
    }

    match os_session::native_provider(data_dir) {
        Some(native) if native.has_key() => {
            debug!("Using existing {} credential", native.name());
            native
        }
        Some(native) if native.is_available() => {
            debug!("Using {} for a new key", native.name());
            native
        }
        Some(native) => {
            warn!(
                "{} is not reachable in this session; falling back to key file",
                native.name()
            );
            Box::new(file)
        }
        None => Box::new(file),
    }
}
