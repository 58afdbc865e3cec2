//! Tabular Writer

use crate::error::Result;
use crate::projector::{Row, COLUMNS};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// What was written by [`TabularWriter::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes rows as CSV under the fixed six-column header
pub struct TabularWriter;

impl TabularWriter {
    /// Create `path` and write the header followed by `rows` in order
    ///
    /// The header is written even when there are no rows. Absent values become
    /// empty cells.
    pub fn write<I>(path: &Path, rows: I) -> Result<TableSummary>
    where
        I: IntoIterator<Item = Row>,
    {
        Self::write_rows(path, rows).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "Not able to create a csv file");
        })
    }

    fn write_rows<I>(path: &Path, rows: I) -> Result<TableSummary>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        writer.write_record(COLUMNS)?;

        let mut written = 0usize;
        for row in rows {
            writer.serialize(&row)?;
            written += 1;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = written, "Csv file is created");

        Ok(TableSummary {
            path: path.to_path_buf(),
            rows: written,
        })
    }
}
