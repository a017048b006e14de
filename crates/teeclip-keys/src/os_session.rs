//! OS-session trust model: the key lives in the desktop credential facility.
//!
//! A fresh random key is handed to the facility under service [`SERVICE_NAME`]
//! and a random account id. The process only keeps the account id, in an
//! owner-only `key.ref` file next to the database. Retrieval uses the ambient
//! authority of the logged-in session, so there is no prompt.
//!
//! One provider exists per facility and each compiles only on its platform:
//!
//! - Windows: [`WindowsCredentialKeyProvider`] (Credential Manager)
//! - macOS: [`MacKeychainKeyProvider`] (Keychain)
//! - Linux: [`SecretServiceKeyProvider`] (Secret Service, kernel keyring cache)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use keyring::Entry;
use rand::RngCore;
use teeclip_crypto::Key;
use tracing::{debug, info};

use crate::file::write_private;
use crate::{KeyCache, KeyError, KeyProvider, Result, KEY_REF_FILE_NAME, SERVICE_NAME};

/// Account id used only to check whether the facility answers at all.
const PROBE_ACCOUNT: &str = "availability-probe";

/// Shared machinery behind every credential-facility provider.
pub(crate) struct CredentialVault {
    facility: &'static str,
    ref_path: PathBuf,
    cache: KeyCache,
}

impl CredentialVault {
    pub(crate) fn new(facility: &'static str, data_dir: &Path) -> Self {
        Self {
            facility,
            ref_path: data_dir.join(KEY_REF_FILE_NAME),
            cache: KeyCache::default(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, account).map_err(|e| self.unavailable(e))
    }

    fn unavailable(&self, err: keyring::Error) -> KeyError {
        KeyError::KeyUnavailable(format!("{}: {err}", self.facility))
    }

    fn read_account(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.ref_path) {
            Ok(account) => {
                let account = account.trim().to_string();
                if account.is_empty() {
                    Err(KeyError::CorruptKey(format!(
                        "{} is empty",
                        self.ref_path.display()
                    )))
                } else {
                    Ok(Some(account))
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(KeyError::Io(err)),
        }
    }

    fn retrieve(&self, account: &str) -> Result<Key> {
        let secret = match self.entry(account)?.get_secret() {
            Ok(secret) => secret,
            Err(keyring::Error::NoEntry) => {
                return Err(KeyError::KeyUnavailable(format!(
                    "{} holds no credential for {SERVICE_NAME}/{account}",
                    self.facility
                )))
            }
            Err(err) => return Err(self.unavailable(err)),
        };
        Key::from_slice(&secret)
            .map_err(|e| KeyError::CorruptKey(format!("{}: {e}", self.facility)))
    }

    fn delete_credential(&self, account: &str) -> Result<()> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(self.unavailable(err)),
        }
    }
}

impl KeyProvider for CredentialVault {
    fn name(&self) -> &'static str {
        self.facility
    }

    fn has_key(&self) -> bool {
        self.ref_path.is_file()
    }

    /// Probes the facility with a lookup that is expected to find nothing.
    fn is_available(&self) -> bool {
        let entry = match Entry::new(SERVICE_NAME, PROBE_ACCOUNT) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("{} unreachable: {err}", self.facility);
                return false;
            }
        };
        match entry.get_secret() {
            Ok(_) | Err(keyring::Error::NoEntry) => true,
            Err(err) => {
                debug!("{} unreachable: {err}", self.facility);
                false
            }
        }
    }

    /// Asks the facility for the key named by `key.ref`.
    fn obtain_key(&self) -> Result<Key> {
        self.cache.get_or_load(|| match self.read_account()? {
            Some(account) => self.retrieve(&account),
            None => Err(KeyError::KeyUnavailable(format!(
                "no key reference at {}",
                self.ref_path.display()
            ))),
        })
    }

    fn generate_key(&self) -> Result<Key> {
        let previous = self.read_account().ok().flatten();

        let mut id = [0u8; 8];
        rand::rngs::OsRng.fill_bytes(&mut id);
        let account = format!("store-{}", hex::encode(id));

        let key = Key::generate();
        self.entry(&account)?
            .set_secret(key.as_bytes())
            .map_err(|e| self.unavailable(e))?;
        write_private(&self.ref_path, account.as_bytes())?;
        info!("Stored new key in {}", self.facility);

        if let Some(old) = previous {
            if let Err(e) = self.delete_credential(&old) {
                debug!("Could not remove superseded credential: {e}");
            }
        }

        self.cache.set(&key);
        Ok(key)
    }

    fn wipe(&self) -> Result<()> {
        self.cache.clear();
        if let Some(account) = self.read_account()? {
            self.delete_credential(&account)?;
        }
        match fs::remove_file(&self.ref_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(KeyError::Io(err)),
        }
    }
}

macro_rules! facility_provider {
    ($(#[doc = $doc:literal])* #[cfg($cfg:meta)] $name:ident => $label:literal) => {
        $(#[doc = $doc])*
        #[cfg($cfg)]
        pub struct $name(CredentialVault);

        #[cfg($cfg)]
        impl $name {
            /// Provider whose reference file lives in `data_dir`.
            pub fn new(data_dir: &Path) -> Self {
                Self(CredentialVault::new($label, data_dir))
            }
        }

        #[cfg($cfg)]
        impl KeyProvider for $name {
            fn name(&self) -> &'static str {
                self.0.name()
            }
            fn has_key(&self) -> bool {
                self.0.has_key()
            }
            fn is_available(&self) -> bool {
                self.0.is_available()
            }
            fn obtain_key(&self) -> Result<Key> {
                self.0.obtain_key()
            }
            fn generate_key(&self) -> Result<Key> {
                self.0.generate_key()
            }
            fn wipe(&self) -> Result<()> {
                self.0.wipe()
            }
        }
    };
}

facility_provider! {
    /// Key held by Windows Credential Manager for the logged-in user.
    #[cfg(target_os = "windows")]
    WindowsCredentialKeyProvider => "windows-credential-manager"
}

facility_provider! {
    /// Key held in the user's macOS login Keychain.
    #[cfg(target_os = "macos")]
    MacKeychainKeyProvider => "macos-keychain"
}

facility_provider! {
    /// Key held by the freedesktop Secret Service of the desktop session.
    #[cfg(target_os = "linux")]
    SecretServiceKeyProvider => "secret-service"
}

/// The credential-facility provider for the running platform, if it has one.
pub fn native_provider(data_dir: &Path) -> Option<Box<dyn KeyProvider>> {
    #[cfg(target_os = "windows")]
    {
        Some(Box::new(WindowsCredentialKeyProvider::new(data_dir)))
    }
    #[cfg(target_os = "macos")]
    {
        Some(Box::new(MacKeychainKeyProvider::new(data_dir)))
    }
    #[cfg(target_os = "linux")]
    {
        Some(Box::new(SecretServiceKeyProvider::new(data_dir)))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let _ = data_dir;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_key_tracks_reference_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let vault = CredentialVault::new("test-facility", dir.path());
        assert!(!vault.has_key());
        fs::write(dir.path().join(KEY_REF_FILE_NAME), "store-00").expect("write");
        assert!(vault.has_key());
    }

    #[test]
    fn test_empty_reference_is_corrupt() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        fs::write(dir.path().join(KEY_REF_FILE_NAME), "  \n").expect("write");
        let vault = CredentialVault::new("test-facility", dir.path());
        assert!(matches!(vault.read_account(), Err(KeyError::CorruptKey(_))));
    }

    #[test]
    fn test_reference_is_trimmed() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        fs::write(dir.path().join(KEY_REF_FILE_NAME), "store-abc\n").expect("write");
        let vault = CredentialVault::new("test-facility", dir.path());
        assert_eq!(
            vault.read_account().expect("read"),
            Some("store-abc".to_string())
        );
    }

    #[test]
    fn test_missing_reference_is_unavailable() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let vault = CredentialVault::new("test-facility", dir.path());
        assert!(matches!(vault.obtain_key(), Err(KeyError::KeyUnavailable(_))));
        assert!(!dir.path().join(KEY_REF_FILE_NAME).exists());
    }

    #[test]
    fn test_native_provider_matches_platform() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let provider = native_provider(dir.path());
        if cfg!(any(
            target_os = "windows",
            target_os = "macos",
            target_os = "linux"
        )) {
            let provider = provider.expect("native provider");
            assert!(!provider.has_key());
        } else {
            assert!(provider.is_none());
        }
    }

    #[test]
    #[ignore] // Needs an unlocked desktop credential facility.
    fn test_native_roundtrip() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let provider = native_provider(dir.path()).expect("native provider");
        let key = provider.generate_key().expect("generate");

        let reopened = native_provider(dir.path()).expect("native provider");
        assert_eq!(reopened.obtain_key().expect("obtain"), key);

        reopened.wipe().expect("wipe");
        assert!(!reopened.has_key());
    }
}
