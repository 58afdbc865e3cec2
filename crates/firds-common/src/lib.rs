//! FIRDS Common Library
//!
//! Shared error handling, logging setup and checksum helpers for the FIRDS
//! ingest workspace.
//!
//! # Example
//!
//! ```no_run
//! use firds_common::checksum::sha256_file;
//! use firds_common::Result;
//!
//! fn fingerprint(path: &str) -> Result<()> {
//!     let digest = sha256_file(path)?;
//!     tracing::info!(%digest, "table fingerprint");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

pub use error::{FirdsError, Result};
