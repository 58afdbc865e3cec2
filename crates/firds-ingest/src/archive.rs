//! Archive Fetcher
//!
//! Downloads the zipped FIRDS report, unpacks it next to the download and
//! returns the first entry that parses as XML, with namespaces stripped.

use crate::error::{IngestError, Result};
use crate::outcome::StageOutcome;
use crate::xml::{self, Element};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

pub struct ArchiveFetcher {
    client: Client,
    archive_path: PathBuf,
    extract_dir: PathBuf,
}

impl ArchiveFetcher {
    /// `archive_path` receives the download; entries are written under `extract_dir`
    pub fn new(client: Client, archive_path: impl Into<PathBuf>, extract_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            archive_path: archive_path.into(),
            extract_dir: extract_dir.into(),
        }
    }

    /// Download, extract and parse the archive behind `url`
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> StageOutcome<Element> {
        let archive = match download(&self.client, url, &self.archive_path).await {
            StageOutcome::Success(path) => path,
            StageOutcome::NoMatch => return StageOutcome::NoMatch,
            StageOutcome::HardFailure(e) => return StageOutcome::HardFailure(e),
        };

        let entries = match extract_all(&archive, &self.extract_dir) {
            Ok(entries) => entries,
            Err(e) if e.is_local_io() => {
                error!(error = %e, "Not able to write extracted entries");
                return StageOutcome::HardFailure(e);
            },
            Err(e) => {
                error!(%url, error = %e, "Not able to extract zip file");
                return StageOutcome::NoMatch;
            },
        };
        info!(%url, entries = entries.len(), "Zip is extracted");

        match first_parsed_document(&entries) {
            Some(root) => StageOutcome::Success(root),
            None => {
                error!(%url, "No archive entry could be converted to an XML tree");
                StageOutcome::NoMatch
            },
        }
    }
}

/// Stream `url` into `dest`
///
/// A non-200 answer is `NoMatch`. Connection errors are `HardFailure`, as are
/// errors writing `dest`.
pub async fn download(client: &Client, url: &str, dest: &Path) -> StageOutcome<PathBuf> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            error!(%url, error = %e, "Network problem while downloading archive");
            return StageOutcome::HardFailure(e.into());
        },
    };

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        error!(%url, status = status.as_u16(), %body, "Archive request was rejected");
        return StageOutcome::NoMatch;
    }

    let total_size = response.content_length().unwrap_or(0);
    let progress = download_progress(total_size, dest);

    let mut file = match File::create(dest) {
        Ok(file) => file,
        Err(e) => {
            error!(path = %dest.display(), error = %e, "Not able to create local archive file");
            return StageOutcome::HardFailure(e.into());
        },
    };

    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                error!(%url, error = %e, "Archive download interrupted");
                return StageOutcome::HardFailure(e.into());
            },
        };
        if let Err(e) = file.write_all(&chunk) {
            error!(path = %dest.display(), error = %e, "Not able to write archive to local disk");
            return StageOutcome::HardFailure(e.into());
        }
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }

    if let Err(e) = file.flush() {
        return StageOutcome::HardFailure(e.into());
    }
    progress.finish_and_clear();

    debug!(path = %dest.display(), bytes = downloaded, "Archive saved");
    StageOutcome::Success(dest.to_path_buf())
}

fn download_progress(total_size: u64, dest: &Path) -> ProgressBar {
    let progress = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        progress.set_style(style.progress_chars("#>-"));
    }
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    progress.set_message(format!("Downloading {}", name));
    progress
}

/// Extract every file entry of the zip at `archive` into `dir`
///
/// Returns the extracted paths in archive-listing order. Zip format errors come
/// back as [`IngestError::Zip`]; failures writing into `dir` as
/// [`IngestError::Io`].
pub fn extract_all(archive: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::with_capacity(zip.len());

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(name = entry.name(), "Skipping zip entry with unsafe path");
            continue;
        };
        let target = dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&target)?);
        let bytes = copy_entry(&mut entry, &mut out)?;
        out.flush()?;

        debug!(path = %target.display(), bytes, "Extracted entry");
        extracted.push(target);
    }

    Ok(extracted)
}

/// Stream one entry into `out` in fixed-size chunks
///
/// Read failures (corrupt data, checksum mismatch) are [`IngestError::Zip`];
/// write failures stay [`IngestError::Io`].
fn copy_entry<R: Read, W: Write>(entry: &mut R, out: &mut W) -> Result<u64> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let n = entry.read(&mut buf).map_err(|e| IngestError::Zip(e.into()))?;
        if n == 0 {
            return Ok(written);
        }
        out.write_all(&buf[..n])?;
        written += n as u64;
    }
}

/// Parse `paths` in order and return the first namespace-stripped document
///
/// Entries after the first success are not read.
pub fn first_parsed_document(paths: &[PathBuf]) -> Option<Element> {
    paths.iter().find_map(|path| match xml::parse_file(path) {
        Ok(mut root) => {
            xml::strip_namespaces(&mut root);
            info!(path = %path.display(), root = %root.tag, "Parsed archive entry");
            Some(root)
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Archive entry is not XML");
            None
        },
    })
}
