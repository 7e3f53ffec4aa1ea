//! Process command - transform and submit a single file.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use dtewatch_core::{ApiClient, DocType, TracingSink, classify, sections, transform};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (point-of-sale .txt export)
    #[arg(required = true)]
    input: PathBuf,

    /// Print the assembled payload instead of submitting it
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let text = fs::read_to_string(&args.input)?;
    let parsed = sections::parse(&text);

    let doc_type = classify::classify(&parsed)?;
    let document = match doc_type {
        DocType::Boleta => transform::boleta::transform(&parsed, &config.merchant)?,
        DocType::Factura => {
            transform::factura::transform(&parsed, &config.merchant, &TracingSink)?
        }
    };

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&document.payload)?);
        return Ok(());
    }

    let client = ApiClient::new(&config.api);
    let response = client.submit(&document).await?;
    if response.accepted() {
        println!(
            "{} Documento tipo {} aceptado",
            style("✓").green(),
            document.doc_type.code()
        );
        if let Some(pdf) = &response.pdf_path {
            println!("  PDF: {pdf}");
        }
        Ok(())
    } else {
        anyhow::bail!(
            "Documento rechazado. StatusCode: {}, StatusDesc: {}",
            response.status_code_display(),
            response.status_desc_display()
        );
    }
}
