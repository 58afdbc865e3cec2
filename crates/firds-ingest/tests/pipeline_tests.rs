//! End-to-end pipeline runs against mock catalog, download and storage servers

mod common;

use common::{
    catalog_response, dltins_sample, ingest_config, zip_bytes, CATALOG_PATH, DLTINS_PATH, HEADER,
};
use firds_common::checksum::sha256_file;
use firds_ingest::config::StorageConfig;
use firds_ingest::Pipeline;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

const FIRST_ROW: &str =
    "DE000A1R07V3,Kreditanst.f.Wiederaufbau Anl.v.2014 (2021),DBFTFB,false,EUR,549300GDPG70E3MBBU98";
const SECOND_ROW: &str =
    r#"DE000A1R07X9,"Kreditanst.f.Wiederaufbau, Anl.v.2014 (2021)",DBFTFB,,EUR,549300GDPG70E3MBBU98"#;

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_response(&server.uri())))
        .mount(server)
        .await;
}

async fn mount_archive(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(DLTINS_PATH))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

fn storage_config(server_uri: &str) -> StorageConfig {
    StorageConfig {
        enabled: true,
        bucket: "firds-archive".to_string(),
        endpoint: Some(server_uri.to_string()),
        access_key: Some("test-access-key".to_string()),
        secret_key: Some("test-secret-key".to_string()),
        path_style: true,
        ..StorageConfig::default()
    }
}

fn table_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("Failed to read table")
        .lines()
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Successful Runs
// ============================================================================

#[tokio::test]
async fn test_run_writes_table_without_archiving() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200)
            .set_body_bytes(zip_bytes(&[("DLTINS_20210117_01of01.xml", &dltins_sample())])),
    )
    .await;

    // Later DLTINS documents are never fetched
    Mock::given(method("GET"))
        .and(path("/DLTINS_20210119_01of01.zip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(report.success);
    assert_eq!(
        report.download_link,
        Some(format!("{}{}", server.uri(), DLTINS_PATH))
    );
    assert_eq!(report.rows_written, 2);
    assert!(report.upload.is_none());

    let table = report.table.expect("Expected a table path");
    assert_eq!(table, work_dir.path().join("file.csv"));
    assert_eq!(table_lines(&table), vec![HEADER, FIRST_ROW, SECOND_ROW]);

    assert!(work_dir.path().join("file.zip").exists());
    assert!(work_dir.path().join("DLTINS_20210117_01of01.xml").exists());
}

#[tokio::test]
async fn test_run_uses_first_parsable_entry() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[
            ("README.txt", b"FIRDS delta file, see attached XML"),
            ("DLTINS_20210117_01of01.xml", &dltins_sample()),
            ("other.xml", b"<Document><TermntdRcrd/></Document>"),
        ])),
    )
    .await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(report.success);
    assert_eq!(report.rows_written, 2);
}

#[tokio::test]
async fn test_run_document_without_records_writes_header() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[(
            "empty.xml",
            br#"<BizData xmlns="urn:head"><Pyld/></BizData>"#,
        )])),
    )
    .await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(report.success);
    assert_eq!(report.rows_written, 0);
    assert_eq!(table_lines(&work_dir.path().join("file.csv")), vec![HEADER]);
}

#[tokio::test]
async fn test_run_archives_table() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200)
            .set_body_bytes(zip_bytes(&[("DLTINS_20210117_01of01.xml", &dltins_sample())])),
    )
    .await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/firds-archive/\d+\.csv$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ingest_config(&server.uri(), work_dir.path());
    config.storage = storage_config(&server.uri());

    let report = Pipeline::new(config).unwrap().run().await.unwrap();

    assert!(report.success);
    let upload = report.upload.expect("Expected an upload");
    let table = report.table.expect("Expected a table path");

    assert_eq!(upload.bucket, "firds-archive");
    let stem = upload.key.strip_suffix(".csv").expect("Key should end in .csv");
    assert!(stem.parse::<i64>().is_ok());
    assert_eq!(upload.size, std::fs::metadata(&table).unwrap().len());
    assert_eq!(upload.checksum, sha256_file(&table).unwrap());
}

// ============================================================================
// Unsuccessful Runs
// ============================================================================

#[tokio::test]
async fn test_run_catalog_rejected() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(!report.success);
    assert!(report.download_link.is_none());
    assert!(!work_dir.path().join("file.csv").exists());
}

#[tokio::test]
async fn test_run_no_matching_document() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();
    mount_catalog(&server).await;

    let mut config = ingest_config(&server.uri(), work_dir.path());
    config.catalog.target_file_type = "DVCAP".to_string();

    let report = Pipeline::new(config).unwrap().run().await.unwrap();

    assert!(!report.success);
    assert!(report.download_link.is_none());
    assert!(report.table.is_none());
}

#[tokio::test]
async fn test_run_archive_not_found() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(&server, ResponseTemplate::new(404).set_body_string("Not Found")).await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(!report.success);
    assert!(report.download_link.is_some());
    assert!(report.table.is_none());
    assert!(!work_dir.path().join("file.csv").exists());
}

#[tokio::test]
async fn test_run_archive_not_a_zip() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(!report.success);
    assert!(report.table.is_none());
}

#[tokio::test]
async fn test_run_no_parsable_entry() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200)
            .set_body_bytes(zip_bytes(&[("notes.txt", b"plain text"), ("broken.xml", b"<a><b></a>")])),
    )
    .await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(!report.success);
    assert!(report.table.is_none());
}

#[tokio::test]
async fn test_run_upload_rejected_keeps_table() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200)
            .set_body_bytes(zip_bytes(&[("DLTINS_20210117_01of01.xml", &dltins_sample())])),
    )
    .await;

    // One attempt only
    Mock::given(method("PUT"))
        .and(path_regex(r"^/firds-archive/\d+\.csv$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ingest_config(&server.uri(), work_dir.path());
    config.storage = storage_config(&server.uri());

    let report = Pipeline::new(config).unwrap().run().await.unwrap();

    assert!(!report.success);
    assert!(report.upload.is_none());
    assert_eq!(report.rows_written, 2);
    assert!(work_dir.path().join("file.csv").exists());
}

#[tokio::test]
async fn test_run_archive_host_unreachable() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    // Catalog answers, but every download link points at a closed port
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(catalog_response("http://127.0.0.1:1")),
        )
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(!report.success);
    assert_eq!(
        report.download_link.as_deref(),
        Some("http://127.0.0.1:1/DLTINS_20210117_01of01.zip")
    );
    assert!(report.table.is_none());
}

#[tokio::test]
async fn test_run_unwritable_archive_file_is_an_error() {
    let server = MockServer::start().await;
    let work_dir = TempDir::new().unwrap();

    mount_catalog(&server).await;
    mount_archive(
        &server,
        ResponseTemplate::new(200)
            .set_body_bytes(zip_bytes(&[("DLTINS_20210117_01of01.xml", &dltins_sample())])),
    )
    .await;

    // A directory where the downloaded archive should go
    std::fs::create_dir(work_dir.path().join("file.zip")).unwrap();

    let pipeline = Pipeline::new(ingest_config(&server.uri(), work_dir.path())).unwrap();
    let err = pipeline.run().await.unwrap_err();

    assert!(err.is_local_io());
    assert!(!work_dir.path().join("file.csv").exists());
}

#[tokio::test]
async fn test_run_unwritable_work_dir_is_an_error() {
    let server = MockServer::start().await;
    let scratch = TempDir::new().unwrap();
    let not_a_dir = scratch.path().join("occupied");
    std::fs::write(&not_a_dir, b"file in the way").unwrap();

    let pipeline = Pipeline::new(ingest_config(&server.uri(), &not_a_dir)).unwrap();
    let err = pipeline.run().await.unwrap_err();

    assert!(err.is_local_io());
}
