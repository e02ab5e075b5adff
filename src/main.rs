use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use price_scout::{AppConfig, BatchPipeline, utils::logging};

#[derive(Debug, Parser)]
#[command(name = "price-scout", version, about = "Look up retailer prices for product codes")]
struct Cli {
    /// Extra configuration file layered over config/*.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the number of concurrent browser workers
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Price every identifier in a workbook and write a report workbook
    Batch {
        input: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Price one identifier and print the result as JSON
    Search { query: String },
    /// Print the site table in match priority order
    Sites,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(workers) = cli.workers {
        config.scraper.workers = workers;
        config.validate().context("Invalid --workers")?;
    }

    let _log_guard = logging::init(&config.logging)?;

    match cli.command {
        Command::Batch { input, output_dir } => {
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&config.workbook.output_dir));
            let pipeline = BatchPipeline::from_config(&config)?;
            let output = pipeline
                .run_file(&input, &output_dir)
                .await
                .with_context(|| format!("Failed to process {}", input.display()))?;
            println!("{}", output.display());
        }
        Command::Search { query } => {
            let pipeline = BatchPipeline::from_config(&config)?;
            let response = pipeline.run_single(&query).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Sites => {
            #[derive(serde::Serialize)]
            struct SiteTable<'a> {
                sites: &'a [price_scout::TargetSite],
            }
            let registry = config.registry();
            print!("{}", toml::to_string(&SiteTable { sites: registry.sites() })?);
        }
    }

    info!("Done");
    Ok(())
}
