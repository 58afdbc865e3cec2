//! Error types for FIRDS ingestion

use firds_common::FirdsError;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for the ingest pipeline
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed document: {0}")]
    Document(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] FirdsError),
}

impl IngestError {
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is a failure of the local filesystem
    ///
    /// These are the only errors the pipeline raises to its caller; everything
    /// else is reported as an unsuccessful run.
    pub fn is_local_io(&self) -> bool {
        match self {
            IngestError::Io(_) => true,
            IngestError::Csv(e) => e.is_io_error(),
            IngestError::Common(FirdsError::Io(_)) => true,
            _ => false,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for IngestError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        IngestError::Xml(err.into())
    }
}
