//! save, list, get and clear.

use std::io::{self, BufRead, IsTerminal, Read, Write};

use anyhow::{bail, Context as _};
use teeclip_history::{ClipEntry, ClipSource, EncryptionMode, Selector};
use teeclip_keys::{select, TrustModel};
use tracing::{debug, warn};

use super::{open_reader, open_store};
use crate::Context;

/// Tee stdin to stdout, then record it.
///
/// A history failure is a warning: the pipe always completes.
pub fn save(ctx: &Context, content_type: &str, source: ClipSource) -> anyhow::Result<()> {
    let mut data = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut data)
        .context("reading stdin")?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;

    if ctx.no_history || !ctx.config.history.enabled || data.is_empty() {
        return Ok(());
    }
    if let Err(e) = record(ctx, &data, content_type, source) {
        warn!("history: {e:#}");
    }
    Ok(())
}

fn record(
    ctx: &Context,
    data: &[u8],
    content_type: &str,
    source: ClipSource,
) -> anyhow::Result<()> {
    let mut config = ctx.config.history_config();
    if config.encryption.is_on() && config.trust_model == TrustModel::Password {
        // stdin holds the clip, so there is no way to ask for the password.
        warn!("Password trust model cannot prompt during save; saving plaintext");
        config.encryption = EncryptionMode::Off;
    }

    let mut store = open_store(ctx, config)?;
    if store.config().encryption.is_on() {
        store.set_key_provider(select::os_session_provider(&ctx.data_dir));
    }

    match store.save(data, content_type, source)? {
        Some(id) => debug!("Saved clip {id}"),
        None => debug!("Skipped duplicate clip"),
    }
    Ok(())
}

pub fn list(ctx: &Context, count: Option<usize>) -> anyhow::Result<()> {
    let store = open_reader(ctx)?;
    let entries = store.list(count.unwrap_or(ctx.config.history.list_count))?;
    if entries.is_empty() {
        println!("History is empty.");
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    for entry in &entries {
        writeln!(stdout, "{}", format_entry(entry))?;
    }
    Ok(())
}

pub fn get(ctx: &Context, position: usize) -> anyhow::Result<()> {
    let store = open_reader(ctx)?;
    let clip = store.get(position)?;
    if clip.entry.sealed {
        bail!("clip {position} is encrypted and no key is available");
    }

    let mut stdout = io::stdout().lock();
    stdout.write_all(&clip.content)?;
    stdout.flush()?;
    Ok(())
}

pub fn clear(ctx: &Context, selector: Option<&str>) -> anyhow::Result<()> {
    let selector = selector.map(Selector::parse).transpose()?;
    let mut store = open_store(ctx, ctx.config.history_config())?;

    if selector.is_none() {
        let total = store.count()?;
        if total == 0 {
            println!("History is already empty.");
            return Ok(());
        }
        if io::stdin().is_terminal() && !confirm(&format!("Delete all {total} clips? [y/N] "))? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let deleted = store.clear(selector.as_ref())?;
    println!("Deleted {deleted} clip(s).");
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES" | "Yes"))
}

fn format_entry(entry: &ClipEntry) -> String {
    let size = if entry.sealed {
        "?".to_string()
    } else {
        format_size(entry.size)
    };
    let marker = if entry.encrypted { "*" } else { " " };
    format!(
        "{:>3}{marker} {}  {:>9}  {:<24}  {}",
        entry.position, entry.timestamp, size, entry.content_type, entry.preview
    )
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    match bytes {
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sealed: bool) -> ClipEntry {
        ClipEntry {
            position: 2,
            id: 17,
            timestamp: "2026-10-16T09:30:00Z".to_string(),
            content_type: (if sealed { "(encrypted)" } else { "text/plain" }).to_string(),
            size: 2048,
            preview: "hello".to_string(),
            source: ClipSource::Pipe,
            encrypted: sealed,
            sealed,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_entry() {
        let line = format_entry(&entry(false));
        assert!(line.starts_with("  2  2026-10-16T09:30:00Z"));
        assert!(line.contains("2.0 KB"));
        assert!(line.ends_with("hello"));
    }

    #[test]
    fn test_format_sealed_entry_hides_size() {
        let line = format_entry(&entry(true));
        assert!(line.starts_with("  2* "));
        assert!(!line.contains("KB"));
        assert!(line.contains("(encrypted)"));
    }
}
