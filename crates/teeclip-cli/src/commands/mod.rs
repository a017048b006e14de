//! Subcommand handlers.
//!
//! Each submodule implements the commands for one area; helpers shared by
//! all of them live here.

pub mod history;
pub mod security;
pub mod settings;

use std::io;

use teeclip_history::{HistoryConfig, HistoryStore};
use teeclip_keys::password::PasswordKeyProvider;
use teeclip_keys::{select, KeyProvider, TrustModel};

use crate::Context;

/// Open the store with the given settings.
pub fn open_store(ctx: &Context, config: HistoryConfig) -> anyhow::Result<HistoryStore> {
    Ok(HistoryStore::open(&ctx.db_path(), config)?)
}

/// Open the store for reading, with a key provider attached only if some
/// clip is encrypted. Rows are read under the trust model they were
/// encrypted with.
pub fn open_reader(ctx: &Context) -> anyhow::Result<HistoryStore> {
    let mut store = open_store(ctx, ctx.config.history_config())?;
    let state = store.encryption_state()?;
    if state.encrypted_rows > 0 {
        let model = state
            .trust_model
            .unwrap_or(ctx.config.security.auth_method);
        let provider = key_provider(ctx, &store, model)?;
        store.set_key_provider(provider);
    }
    Ok(store)
}

/// Provider for `model`, rooted in the data directory.
pub fn key_provider(
    ctx: &Context,
    store: &HistoryStore,
    model: TrustModel,
) -> anyhow::Result<Box<dyn KeyProvider>> {
    Ok(match model {
        TrustModel::OsSession => select::os_session_provider(&ctx.data_dir),
        TrustModel::Password => Box::new(PasswordKeyProvider::new(
            store.password_salt()?,
            Box::new(terminal_prompt),
        )),
    })
}

/// Read a password from the controlling terminal without echo.
fn terminal_prompt(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}
