//! Watch command - run the intake loop until stopped.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;

use dtewatch_core::models::config::ConfigSource;
use dtewatch_core::{ApiClient, FileConfigSource, IntakeLoop};

use super::{default_log_db_path, load_config};
use crate::dispatch::DownloadDispatch;
use crate::event_log::EventLog;

/// Arguments for the watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Override the watched directory
    #[arg(long)]
    watch_dir: Option<PathBuf>,

    /// Override the processed archive directory
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Override the polling interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Path to the SQLite event database
    #[arg(long)]
    log_db: Option<PathBuf>,
}

pub async fn run(args: WatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = args.watch_dir {
        config.directories.watch_dir = dir;
    }
    if let Some(dir) = args.processed_dir {
        config.directories.processed_dir = dir;
    }
    if let Some(secs) = args.interval {
        config.directories.interval_secs = secs;
    }

    let db_path = args.log_db.unwrap_or_else(default_log_db_path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let events = Arc::new(EventLog::open(&db_path)?);

    // With an explicit config file the merchant block is re-read at loop
    // start; otherwise the already-loaded defaults are used.
    let source: Box<dyn ConfigSource> = match config_path {
        Some(path) => Box::new(FileConfigSource::new(path)),
        None => Box::new(config.merchant.clone()),
    };
    let client = ApiClient::new(&config.api);
    let mut intake =
        IntakeLoop::new(&config.directories, source, client).with_sink(Box::new(events));
    if config.download.enabled {
        intake = intake.with_dispatch(Box::new(DownloadDispatch::new(&config.download)));
    }

    intake.start()?;
    println!(
        "{} Observando {} cada {} segundos (Ctrl-C para detener)",
        style("✓").green(),
        config.directories.watch_dir.display(),
        config.directories.interval_secs
    );

    // Ctrl-C requests a cooperative stop; the current cycle finishes first.
    let handle = intake.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });

    intake.run().await?;
    println!("{} Procesamiento detenido", style("✓").green());
    Ok(())
}
