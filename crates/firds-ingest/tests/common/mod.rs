//! Shared helpers for the ingest integration tests
//!
//! Fixtures live in `tests/fixtures/`; archives are zipped in memory so every
//! test controls entry order.

#![allow(dead_code)]

use firds_ingest::config::{CatalogConfig, IngestConfig};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;

pub const CATALOG_PATH: &str = "/solr/esma_registers_firds_files/select";
pub const DLTINS_PATH: &str = "/DLTINS_20210117_01of01.zip";

pub const HEADER: &str = "FinInstrmGnlAttrbts.Id,FinInstrmGnlAttrbts.FullNm,FinInstrmGnlAttrbts.ClssfctnTp,FinInstrmGnlAttrbts.CmmdtyDerivInd,FinInstrmGnlAttrbts.NtnlCcy,Issr";

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("Failed to read fixture")
}

/// Catalog response whose download links point at `base_url`
pub fn catalog_response(base_url: &str) -> String {
    fixture("catalog_response.xml").replace("{{BASE_URL}}", base_url)
}

pub fn dltins_sample() -> Vec<u8> {
    fixture("dltins_sample.xml").into_bytes()
}

/// Zip `entries` in the given order
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("Failed to start zip entry");
        writer.write_all(data).expect("Failed to write zip entry");
    }
    writer.finish().expect("Failed to finish zip").into_inner()
}

pub fn catalog_config(server_uri: &str) -> CatalogConfig {
    CatalogConfig {
        url: format!("{}{}", server_uri, CATALOG_PATH),
        ..CatalogConfig::default()
    }
}

/// Pipeline configuration against a mock server, writing into `work_dir`
pub fn ingest_config(server_uri: &str, work_dir: &Path) -> IngestConfig {
    IngestConfig {
        catalog: catalog_config(server_uri),
        work_dir: work_dir.to_path_buf(),
        http_timeout_secs: 10,
        ..IngestConfig::default()
    }
}
