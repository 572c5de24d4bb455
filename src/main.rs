use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use mgf_offset::config::Config;
use mgf_offset::dispatcher;
use mgf_offset::logging;
use mgf_offset::metadata::SqliteMetadata;
use mgf_offset::processor::CommandProcessor;
use mgf_offset::{RunController, RunOutcome};

const USAGE: &str = "command: mgf-offset <WORK_DIR>";

#[derive(Parser)]
#[command(name = "mgf-offset")]
#[command(version, about = "Add spectrum offsets to uploaded MGF files")]
pub struct Cli {
    /// Working directory holding the lock, upload flags and markers
    pub work_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    logging::init_console();

    println!("{}", "=".repeat(100));
    println!(
        "{}",
        style(format!("MGF Offset (v{})", env!("CARGO_PKG_VERSION"))).bold()
    );

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print().context("Failed to print help")?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(_) => {
            println!("{}", USAGE);
            return Ok(ExitCode::SUCCESS);
        }
    };

    let config = Config::new(&cli.work_dir)?;
    tracing::info!("workDir: {}", config.work_dir.display());
    if config.ensure_work_dir()? {
        tracing::info!("workDir: {} didn't exist. Created the folder", config.work_dir.display());
    }
    for warning in config.toml.validate() {
        tracing::warn!("{}", warning);
    }

    let db_path = config
        .toml
        .database
        .path
        .clone()
        .context("No metadata database configured. Set [database] path or MGF_DATABASE")?;
    let lookup = Arc::new(SqliteMetadata::open(&db_path, &config.toml.database)?);
    let processor = Arc::new(CommandProcessor::from_config(&config)?);

    let controller =
        RunController::new(config, lookup, processor).with_interrupt(dispatcher::ctrl_c());
    match controller.run().await {
        RunOutcome::Blocked => Ok(ExitCode::SUCCESS),
        RunOutcome::Completed(summary) => {
            if summary.no_work {
                println!("Nothing to do");
            } else {
                println!(
                    "Dispatched {} file(s), {} failed",
                    summary.dispatched(),
                    summary.failed()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Failed(_) => Ok(ExitCode::FAILURE),
    }
}
