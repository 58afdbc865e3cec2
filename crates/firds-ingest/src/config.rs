//! Configuration management
//!
//! Everything the pipeline needs is carried by [`IngestConfig`], built from
//! defaults, a `.env` file and `FIRDS_*` / `S3_*` environment variables.

use crate::error::{IngestError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// ESMA FIRDS file catalog (Solr select endpoint).
pub const DEFAULT_CATALOG_URL: &str =
    "https://registers.esma.europa.eu/solr/esma_registers_firds_files/select";

/// Start of the publication window queried from the catalog.
pub const DEFAULT_PUBLICATION_FROM: &str = "2021-01-17T00:00:00Z";

/// End of the publication window queried from the catalog.
pub const DEFAULT_PUBLICATION_TO: &str = "2021-01-19T23:59:59Z";

/// First result offset requested from the catalog.
pub const DEFAULT_CATALOG_START: u32 = 0;

/// Page size requested from the catalog.
pub const DEFAULT_CATALOG_ROWS: u32 = 100;

/// File type of the delta (new/terminated instruments) reports.
pub const DEFAULT_TARGET_FILE_TYPE: &str = "DLTINS";

pub const DEFAULT_ARCHIVE_FILE_NAME: &str = "file.zip";
pub const DEFAULT_TABLE_FILE_NAME: &str = "file.csv";

/// Timeout applied to each HTTP request, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_STORAGE_BUCKET: &str = "BUCKET_NAME";
pub const DEFAULT_STORAGE_REGION: &str = "us-east-1";

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub catalog: CatalogConfig,

    /// Directory receiving the downloaded archive, its entries and the table
    pub work_dir: PathBuf,

    pub archive_file_name: String,
    pub table_file_name: String,
    pub http_timeout_secs: u64,

    pub storage: StorageConfig,
}

/// Catalog query parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub url: String,
    pub publication_from: DateTime<Utc>,
    pub publication_to: DateTime<Utc>,
    pub start: u32,
    pub rows: u32,
    /// `file_type` value of the catalog document to select
    pub target_file_type: String,
}

/// Remote archive destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub enabled: bool,
    pub bucket: String,
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, localstack, ...)
    pub endpoint: Option<String>,
    /// Static credentials; the ambient AWS provider chain is used when unset
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
}

impl CatalogConfig {
    /// Solr filter query restricting results to the publication window
    pub fn publication_filter(&self) -> String {
        format!(
            "publication_date:[{} TO {}]",
            self.publication_from.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.publication_to.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    /// Query string parameters sent with the catalog request, in order
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", "*".to_string()),
            ("fq", self.publication_filter()),
            ("wt", "xml".to_string()),
            ("indent", "true".to_string()),
            ("start", self.start.to_string()),
            ("rows", self.rows.to_string()),
        ]
    }
}

impl IngestConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = IngestConfig {
            catalog: CatalogConfig {
                url: env_or("FIRDS_CATALOG_URL", defaults.catalog.url),
                publication_from: env_timestamp("FIRDS_PUBLICATION_FROM")?
                    .unwrap_or(defaults.catalog.publication_from),
                publication_to: env_timestamp("FIRDS_PUBLICATION_TO")?
                    .unwrap_or(defaults.catalog.publication_to),
                start: env_parse("FIRDS_CATALOG_START").unwrap_or(defaults.catalog.start),
                rows: env_parse("FIRDS_CATALOG_ROWS").unwrap_or(defaults.catalog.rows),
                target_file_type: env_or(
                    "FIRDS_TARGET_FILE_TYPE",
                    defaults.catalog.target_file_type,
                ),
            },
            work_dir: std::env::var("FIRDS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            archive_file_name: env_or("FIRDS_ARCHIVE_FILE", defaults.archive_file_name),
            table_file_name: env_or("FIRDS_TABLE_FILE", defaults.table_file_name),
            http_timeout_secs: env_parse("FIRDS_HTTP_TIMEOUT")
                .unwrap_or(defaults.http_timeout_secs),
            storage: StorageConfig {
                enabled: env_parse("FIRDS_ARCHIVE_ENABLED").unwrap_or(defaults.storage.enabled),
                bucket: env_or("S3_BUCKET", defaults.storage.bucket),
                region: env_or("S3_REGION", defaults.storage.region),
                endpoint: std::env::var("S3_ENDPOINT").ok(),
                access_key: std::env::var("S3_ACCESS_KEY")
                    .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
                    .ok(),
                secret_key: std::env::var("S3_SECRET_KEY")
                    .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
                    .ok(),
                path_style: env_parse("S3_PATH_STYLE").unwrap_or(defaults.storage.path_style),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.catalog.url.is_empty() {
            return Err(IngestError::config("Catalog URL cannot be empty"));
        }

        if self.catalog.publication_from > self.catalog.publication_to {
            return Err(IngestError::config(format!(
                "Publication window starts ({}) after it ends ({})",
                self.catalog.publication_from, self.catalog.publication_to
            )));
        }

        if self.catalog.rows == 0 {
            return Err(IngestError::config("Catalog rows must be greater than 0"));
        }

        if self.catalog.target_file_type.is_empty() {
            return Err(IngestError::config("Target file type cannot be empty"));
        }

        if self.archive_file_name.is_empty() || self.table_file_name.is_empty() {
            return Err(IngestError::config("Archive and table file names cannot be empty"));
        }

        if self.http_timeout_secs == 0 {
            return Err(IngestError::config("HTTP timeout must be greater than 0"));
        }

        if self.storage.enabled && self.storage.bucket.is_empty() {
            return Err(IngestError::config("Archiving is enabled but no bucket is configured"));
        }

        Ok(())
    }

    pub fn archive_path(&self) -> PathBuf {
        self.work_dir.join(&self.archive_file_name)
    }

    pub fn table_path(&self) -> PathBuf {
        self.work_dir.join(&self.table_file_name)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            work_dir: PathBuf::from("."),
            archive_file_name: DEFAULT_ARCHIVE_FILE_NAME.to_string(),
            table_file_name: DEFAULT_TABLE_FILE_NAME.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            storage: StorageConfig::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.to_string(),
            publication_from: parse_timestamp(DEFAULT_PUBLICATION_FROM)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            publication_to: parse_timestamp(DEFAULT_PUBLICATION_TO)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            start: DEFAULT_CATALOG_START,
            rows: DEFAULT_CATALOG_ROWS,
            target_file_type: DEFAULT_TARGET_FILE_TYPE.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            region: DEFAULT_STORAGE_REGION.to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            path_style: false,
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_timestamp(key: &str) -> Result<Option<DateTime<Utc>>> {
    match std::env::var(key) {
        Ok(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
            IngestError::config(format!("{} is not an RFC 3339 timestamp: {}", key, raw))
        }),
        Err(_) => Ok(None),
    }
}
