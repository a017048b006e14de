//! encrypt and decrypt.

use teeclip_keys::TrustModel;
use tracing::info;

use super::{key_provider, open_store};
use crate::Context;

pub fn encrypt(ctx: &Context) -> anyhow::Result<()> {
    let model = ctx.config.security.auth_method;
    let mut store = open_store(ctx, ctx.config.history_config())?;
    let state = store.encryption_state()?;

    let provider = key_provider(ctx, &store, model)?;
    if model == TrustModel::Password && state.encrypted_rows == 0 {
        // First password: ask twice. The provider caches the result.
        provider.generate_key()?;
    }
    info!("Key custody: {}", provider.name());
    store.set_key_provider(provider);

    let encrypted = store.encrypt_all()?;
    println!("Encrypted {encrypted} clip(s) under the {model} trust model.");
    if !ctx.config.security.encryption.is_on() {
        println!(
            "New clips are still saved in the clear; set encryption = \"on\" under [security] in {}.",
            ctx.config_path.display()
        );
    }
    Ok(())
}

pub fn decrypt(ctx: &Context) -> anyhow::Result<()> {
    let mut store = open_store(ctx, ctx.config.history_config())?;
    let state = store.encryption_state()?;
    if state.encrypted_rows == 0 {
        println!("No encrypted clips.");
        return Ok(());
    }

    let model = state
        .trust_model
        .unwrap_or(ctx.config.security.auth_method);
    let provider = key_provider(ctx, &store, model)?;
    store.set_key_provider(provider);

    let decrypted = store.decrypt_all()?;
    if let Some(provider) = store.key_provider() {
        provider.wipe()?;
    }
    println!("Decrypted {decrypted} clip(s); the key has been destroyed.");
    if ctx.config.security.encryption.is_on() {
        println!(
            "encryption = \"on\" is still set in {}; new clips will use a fresh key.",
            ctx.config_path.display()
        );
    }
    Ok(())
}
