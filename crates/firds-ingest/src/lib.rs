//! FIRDS Ingest Library
//!
//! Pulls the ESMA FIRDS file catalog, downloads the selected delta report
//! archive, flattens its terminated-instrument records into a CSV table and
//! optionally archives that table in S3-compatible storage.
//!
//! # Stages
//!
//! - **Dataset Locator** ([`catalog`]): query the catalog, pick the first `DLTINS` document
//! - **Archive Fetcher** ([`archive`]): download, unzip and parse the report
//! - **Record Projector** ([`projector`]): one row per `TermntdRcrd`
//! - **Tabular Writer** ([`writer`]): six-column CSV
//! - **Remote Archiver** ([`archiver`]): upload under `<unix-timestamp>.csv`
//!
//! # Example
//!
//! ```no_run
//! use firds_ingest::{IngestConfig, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::new(IngestConfig::load()?)?;
//!     let report = pipeline.run().await?;
//!     println!("success: {}", report.success);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod archive;
pub mod archiver;
pub mod catalog;
pub mod config;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod projector;
pub mod writer;
pub mod xml;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use outcome::StageOutcome;
pub use pipeline::{Pipeline, RunReport};
