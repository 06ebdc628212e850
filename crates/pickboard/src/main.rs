// Pickboard entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Load config (writing defaults on first run)
// 3. Initialize tracing (log to file, stdout is for command output)
// 4. Open the board store (SQLite, or memory for --ephemeral)
// 5. Load the board and run the command

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pickboard::cli::{self, Cli, Console};
use pickboard::config::{self, Config, StorageBackend};
use pickboard_core::board::tracker::PickTracker;
use pickboard_core::db::{Database, KeyValueStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line
    let args = Cli::parse();

    // 2. Load config
    let config = config::load_config(&args.base_dir).context("failed to load configuration")?;

    // 3. Initialize tracing
    init_tracing(&args.base_dir, &config)?;
    info!("Pickboard starting: {:?}", args.command);

    // 4. Open the board store
    let store = open_store(&config, args.ephemeral)?;

    // 5. Load the board and run the command
    let mut tracker = PickTracker::load(store);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut console = Console {
        out: &mut out,
        input: &mut input,
        export_dir: args.base_dir.join(&config.export.directory),
    };

    cli::execute(args.command, &mut tracker, &mut console).await?;
    out.flush()?;
    Ok(())
}

fn open_store(config: &Config, ephemeral: bool) -> anyhow::Result<Box<dyn KeyValueStore>> {
    if ephemeral || config.storage.backend == StorageBackend::Memory {
        info!("Using in-memory board store");
        return Ok(Box::new(MemoryStore::new()));
    }

    let path = config.db_path()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path_str = path
        .to_str()
        .with_context(|| format!("database path is not valid UTF-8: {}", path.display()))?;
    let db = Database::open(path_str).context("failed to open database")?;
    info!("Database opened at {}", path.display());
    Ok(Box::new(db))
}

/// Initialize tracing to log to a file (stdout carries command output).
fn init_tracing(base_dir: &Path, config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join(&config.logging.directory);
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("pickboard.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
