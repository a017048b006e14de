//! teeclip: encrypted clipboard history from the command line.
//!
//! One short-lived, single-threaded process per invocation. All state lives
//! in `$TEECLIP_HOME` (default `~/.teeclip`): `config.toml`, `history.db`
//! and the key custody file.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use teeclip_history::ClipSource;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::TeeclipConfig;

#[derive(Parser, Debug)]
#[command(
    name = "teeclip",
    version,
    about = "Like tee, with an encrypted clipboard history."
)]
struct Cli {
    /// Suppress warning messages.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Do not record anything in history.
    #[arg(long, global = true)]
    no_history: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read stdin, echo it to stdout and save it to history.
    Save {
        /// Content type recorded with the clip.
        #[arg(long = "type", default_value = "text/plain")]
        content_type: String,

        /// Where the clip came from: pipe, clipboard or manual.
        #[arg(long, default_value = "pipe")]
        source: ClipSource,
    },

    /// Show the most recent clips.
    List {
        /// Number of clips (default: history.list_count).
        count: Option<usize>,
    },

    /// Write clip N (1 = newest) to stdout.
    Get {
        position: usize,
    },

    /// Delete clips, e.g. `3`, `2,4:10`. No selector deletes everything.
    Clear {
        selector: Option<String>,
    },

    /// Encrypt every stored clip under the configured trust model.
    Encrypt,

    /// Decrypt every stored clip and destroy the key.
    Decrypt,

    /// Print the effective configuration.
    Config,
}

/// Shared state for one invocation.
pub struct Context {
    pub config: TeeclipConfig,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub no_history: bool,
}

impl Context {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(config::DB_FILE_NAME)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let data_dir = config::data_dir();
    let config_path = data_dir.join(config::CONFIG_FILE_NAME);
    let (config, config_warning) = match TeeclipConfig::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (TeeclipConfig::default(), Some(e)),
    };

    let quiet = cli.quiet || config.output.quiet;
    init_tracing(&config.output.log_level, quiet);
    if let Some(e) = config_warning {
        warn!("{e}; using defaults");
    }

    let ctx = Context {
        config,
        data_dir,
        config_path,
        no_history: cli.no_history,
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("teeclip: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Save {
            content_type,
            source,
        } => commands::history::save(ctx, &content_type, source),
        Command::List { count } => commands::history::list(ctx, count),
        Command::Get { position } => commands::history::get(ctx, position),
        Command::Clear { selector } => commands::history::clear(ctx, selector.as_deref()),
        Command::Encrypt => commands::security::encrypt(ctx),
        Command::Decrypt => commands::security::decrypt(ctx),
        Command::Config => commands::settings::show(ctx),
    }
}

/// Log to stderr. `RUST_LOG` overrides the configured level; `--quiet`
/// keeps only errors.
fn init_tracing(log_level: &str, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
