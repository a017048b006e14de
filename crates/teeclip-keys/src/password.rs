//! Password trust model.
//!
//! Nothing key-shaped is persisted. The key is derived from the password and
//! the salt kept in store metadata. A wrong password derives a different key
//! without complaint; it is caught later, when row authentication fails.

use std::io;

use teeclip_crypto::kdf::{self, PBKDF2_ITERATIONS, SALT_SIZE};
use teeclip_crypto::Key;
use zeroize::Zeroizing;

use crate::{KeyCache, KeyError, KeyProvider, Result};

/// Reads a password from the user.
pub trait PasswordPrompt: Send + Sync {
    fn read_password(&self, prompt: &str) -> io::Result<String>;
}

impl<F> PasswordPrompt for F
where
    F: Fn(&str) -> io::Result<String> + Send + Sync,
{
    fn read_password(&self, prompt: &str) -> io::Result<String> {
        self(prompt)
    }
}

/// Key derived from a password with PBKDF2-HMAC-SHA256.
pub struct PasswordKeyProvider {
    salt: [u8; SALT_SIZE],
    iterations: u32,
    prompt: Box<dyn PasswordPrompt>,
    cache: KeyCache,
}

impl PasswordKeyProvider {
    pub fn new(salt: [u8; SALT_SIZE], prompt: Box<dyn PasswordPrompt>) -> Self {
        Self::with_iterations(salt, prompt, PBKDF2_ITERATIONS)
    }

    /// Same as [`new`](Self::new) with a custom PBKDF2 iteration count.
    pub fn with_iterations(
        salt: [u8; SALT_SIZE],
        prompt: Box<dyn PasswordPrompt>,
        iterations: u32,
    ) -> Self {
        Self {
            salt,
            iterations,
            prompt,
            cache: KeyCache::default(),
        }
    }

    fn ask(&self, prompt: &str) -> Result<Zeroizing<String>> {
        let password = Zeroizing::new(
            self.prompt
                .read_password(prompt)
                .map_err(|e| KeyError::Prompt(e.to_string()))?,
        );
        if password.is_empty() {
            return Err(KeyError::EmptyPassword);
        }
        Ok(password)
    }

    fn derive(&self, password: &str) -> Result<Key> {
        Ok(kdf::derive_key_custom(
            password.as_bytes(),
            &self.salt,
            self.iterations,
        )?)
    }
}

impl KeyProvider for PasswordKeyProvider {
    fn name(&self) -> &'static str {
        "password"
    }

    /// The salt is all the custody there is, so a key can always be derived.
    fn has_key(&self) -> bool {
        true
    }

    fn obtain_key(&self) -> Result<Key> {
        self.cache.get_or_load(|| {
            let password = self.ask("Encryption password: ")?;
            self.derive(&password)
        })
    }

    fn generate_key(&self) -> Result<Key> {
        let password = self.ask("New encryption password: ")?;
        let confirm = self.ask("Confirm password: ")?;
        if *password != *confirm {
            return Err(KeyError::PasswordMismatch);
        }
        let key = self.derive(&password)?;
        self.cache.set(&key);
        Ok(key)
    }

    /// Only the cached key is forgotten; the salt belongs to the store.
    fn wipe(&self) -> Result<()> {
        self.cache.clear();
        Ok(())
    }
}
