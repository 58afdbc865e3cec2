//! Remote Archiver
//!
//! Uploads the produced table to an S3-compatible bucket under
//! `<unix-timestamp>.csv`. Failures are reported, never retried.

use crate::config::StorageConfig;
use crate::error::{IngestError, Result};
use crate::outcome::StageOutcome;
use aws_sdk_s3::{
    config::{retry::RetryConfig, Credentials, Region},
    primitives::ByteStream,
    Client,
};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, error, info, instrument};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Object key for an upload made at `timestamp` (seconds since the epoch)
pub fn object_key_for(timestamp: i64) -> String {
    format!("{}.csv", timestamp)
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub checksum: String,
    pub size: u64,
}

#[derive(Clone)]
pub struct RemoteArchiver {
    client: Client,
    bucket: String,
}

impl RemoteArchiver {
    /// Build the storage client
    ///
    /// Static credentials are used when both keys are configured, otherwise
    /// the ambient AWS provider chain.
    pub async fn new(config: StorageConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(IngestError::storage("no destination bucket configured"));
        }

        debug!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "Initializing storage client"
        );

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => aws_sdk_s3::Config::builder().credentials_provider(
                Credentials::new(access_key, secret_key, None, None, "firds-ingest"),
            ),
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style)
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, "Storage client initialized");

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    /// Upload `path` under a key derived from the current time
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn archive(&self, path: &Path) -> StageOutcome<UploadResult> {
        let key = object_key_for(Utc::now().timestamp());
        info!(path = %path.display(), %key, "Trying to upload csv file to bucket");

        match self.upload(path, &key).await {
            Ok(result) => {
                info!(path = %path.display(), key = %result.key, "Uploaded csv file");
                StageOutcome::Success(result)
            },
            Err(e) => {
                error!(path = %path.display(), error = %e, "Csv upload failed");
                StageOutcome::HardFailure(e)
            },
        }
    }

    async fn upload(&self, path: &Path, key: &str) -> Result<UploadResult> {
        let checksum = firds_common::checksum::sha256_file(path)
            .map_err(|e| IngestError::storage(format!("cannot read {}: {}", path.display(), e)))?;
        let size = std::fs::metadata(path)
            .map_err(|e| IngestError::storage(format!("cannot stat {}: {}", path.display(), e)))?
            .len();

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| IngestError::storage(format!("cannot stream {}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(CSV_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| IngestError::storage(format!("upload to s3://{}/{} failed: {}", self.bucket, key, e)))?;

        Ok(UploadResult {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            checksum,
            size,
        })
    }
}
