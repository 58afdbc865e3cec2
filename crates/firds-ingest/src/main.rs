//! FIRDS Ingest - delta report to CSV

use anyhow::Result;
use clap::Parser;
use firds_common::logging::{init_logging, LogConfig, LogLevel};
use firds_ingest::{IngestConfig, Pipeline};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "firds-ingest")]
#[command(author, version, about = "ESMA FIRDS delta report ingestion")]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Directory for the downloaded archive, its entries and the CSV table
    #[arg(long, env = "FIRDS_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Upload the table to the configured bucket
    #[arg(long)]
    archive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // LOG_* variables take precedence over the flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("firds-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = IngestConfig::load()?;
    if let Some(work_dir) = cli.work_dir {
        config.work_dir = work_dir;
    }
    if cli.archive {
        config.storage.enabled = true;
    }

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run().await.inspect_err(|e| {
        error!(error = %e, "Ingestion aborted");
    })?;

    info!(
        success = report.success,
        rows = report.rows_written,
        table = ?report.table,
        upload = ?report.upload.as_ref().map(|u| &u.key),
        "all over output: {}",
        report.success
    );
    Ok(())
}
