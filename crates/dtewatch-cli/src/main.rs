//! CLI daemon for Chilean DTE file intake and submission.

mod commands;
mod dispatch;
mod event_log;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, log, process, watch};

/// Chilean DTE intake - watch a directory and submit documents to the
/// invoicing API
#[derive(Parser)]
#[command(name = "dtewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the intake directory and process files until stopped
    Watch(watch::WatchArgs),

    /// Process a single file and exit
    Process(process::ProcessArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Show persisted operator events
    Log(log::LogArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    match cli.command {
        Commands::Watch(args) => watch::run(args, cli.config.as_deref()).await,
        Commands::Process(args) => process::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args).await,
        Commands::Log(args) => log::run(args, cli.config.as_deref()).await,
    }
}
