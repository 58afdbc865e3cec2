//! End-to-end ingestion run
//!
//! Dataset Locator → Archive Fetcher → Record Projector → Tabular Writer →
//! Remote Archiver (when enabled). Stages run one after another; each only
//! sees what the previous one returned.

use crate::archive::ArchiveFetcher;
use crate::archiver::{RemoteArchiver, UploadResult};
use crate::catalog::DatasetLocator;
use crate::config::IngestConfig;
use crate::error::Result;
use crate::outcome::StageOutcome;
use crate::projector::project_records;
use crate::writer::{TableSummary, TabularWriter};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Summary of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub success: bool,
    pub download_link: Option<String>,
    pub table: Option<PathBuf>,
    pub rows_written: usize,
    pub upload: Option<UploadResult>,
}

pub struct Pipeline {
    config: IngestConfig,
    client: Client,
}

impl Pipeline {
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("firds-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    /// Run every stage once
    ///
    /// Returns `Err` only for local filesystem failures. Every other problem
    /// ends the run with `success == false`.
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();
        std::fs::create_dir_all(&self.config.work_dir)?;

        let locator = DatasetLocator::new(self.client.clone(), self.config.catalog.clone());
        let Some(document) = settle(locator.locate().await, "locate dataset")? else {
            return Ok(report);
        };
        let Some(link) = document.download_link else {
            return Ok(report);
        };
        info!(download_link = %link, "Selected dataset");
        report.download_link = Some(link.clone());

        let fetcher = ArchiveFetcher::new(
            self.client.clone(),
            self.config.archive_path(),
            &self.config.work_dir,
        );
        let Some(root) = settle(fetcher.fetch(&link).await, "fetch archive")? else {
            info!("Zip is not converted to xml tree");
            return Ok(report);
        };

        let TableSummary { path, rows } =
            TabularWriter::write(&self.config.table_path(), project_records(&root))?;
        drop(root);
        report.table = Some(path.clone());
        report.rows_written = rows;

        let digest = firds_common::checksum::sha256_file(&path)?;
        debug!(path = %path.display(), sha256 = %digest, "Table checksum");

        if !self.config.storage.enabled {
            report.success = true;
            return Ok(report);
        }

        let archiver = match RemoteArchiver::new(self.config.storage.clone()).await {
            Ok(archiver) => archiver,
            Err(e) => {
                warn!(error = %e, "Storage client initialization failed");
                return Ok(report);
            },
        };
        if let Some(upload) = settle(archiver.archive(&path).await, "archive table")? {
            report.upload = Some(upload);
            report.success = true;
        }

        Ok(report)
    }
}

/// Collapse a stage outcome for the run
///
/// Local I/O failures propagate; any other failure or a `NoMatch` ends the run.
fn settle<T>(outcome: StageOutcome<T>, stage: &str) -> Result<Option<T>> {
    match outcome {
        StageOutcome::Success(value) => Ok(Some(value)),
        StageOutcome::NoMatch => {
            info!(stage, "Nothing to process");
            Ok(None)
        },
        StageOutcome::HardFailure(e) if e.is_local_io() => Err(e),
        StageOutcome::HardFailure(e) => {
            warn!(stage, error = %e, "Stage failed");
            Ok(None)
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    #[test]
    fn test_settle() {
        assert_eq!(settle(StageOutcome::Success(5), "t").unwrap(), Some(5));
        assert_eq!(settle(StageOutcome::<u8>::NoMatch, "t").unwrap(), None);

        let soft = StageOutcome::<u8>::HardFailure(IngestError::document("bad"));
        assert_eq!(settle(soft, "t").unwrap(), None);

        let hard = StageOutcome::<u8>::HardFailure(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk",
        )));
        assert!(settle(hard, "t").is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = IngestConfig::default();
        config.table_file_name.clear();
        assert!(Pipeline::new(config).is_err());
    }
}
