//! config: print the effective configuration.

use super::open_store;
use crate::Context;

pub fn show(ctx: &Context) -> anyhow::Result<()> {
    let exists = if ctx.config_path.is_file() { "yes" } else { "no" };
    println!("Config file: {}", ctx.config_path.display());
    println!("  exists: {exists}");
    println!("Data directory: {}", ctx.data_dir.display());
    println!();
    print!("{}", toml::to_string_pretty(&ctx.config)?);

    if ctx.db_path().is_file() {
        let store = open_store(ctx, ctx.config.history_config())?;
        let state = store.encryption_state()?;
        let model = state
            .trust_model
            .map_or_else(|| "none".to_string(), |m| m.to_string());
        println!();
        println!(
            "History: {} clip(s), {} encrypted (trust model: {model})",
            state.total_rows, state.encrypted_rows
        );
    }
    Ok(())
}
