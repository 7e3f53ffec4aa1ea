//! Log command - show persisted operator events.

use std::path::PathBuf;

use clap::Args;
use console::style;

use super::default_log_db_path;
use crate::event_log::EventLog;

/// Arguments for the log command.
#[derive(Args)]
pub struct LogArgs {
    /// Number of events to show
    #[arg(short = 'n', long, default_value = "20")]
    limit: u32,

    /// Path to the SQLite event database
    #[arg(long)]
    log_db: Option<PathBuf>,
}

pub async fn run(args: LogArgs, _config_path: Option<&str>) -> anyhow::Result<()> {
    let db_path = args.log_db.unwrap_or_else(default_log_db_path);
    if !db_path.exists() {
        println!("No hay eventos registrados.");
        return Ok(());
    }

    let events = EventLog::open(&db_path)?;
    for row in events.recent(args.limit)? {
        let tag = format!("{:7}", row.tipo);
        let tag = match row.tipo.as_str() {
            "ERROR" => style(tag).red(),
            "WARNING" => style(tag).yellow(),
            _ => style(tag).green(),
        };
        println!("{} {} {} {}", row.fecha, row.hora, tag, row.asunto);
    }

    Ok(())
}
