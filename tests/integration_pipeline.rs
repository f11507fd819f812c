//! Integration tests for the full pipeline
//!
//! These tests build zip archives in memory, serve them either from disk or
//! from a mock HTTP server, and drive the public pipeline API end to end.

use gudid_processor::app::services::cleanup::{CleanupReport, clean_extract_dir};
use gudid_processor::app::services::progress::{ProgressSink, RecordingProgress};
use gudid_processor::{
    ArchiveSource, Config, Error, Pipeline, PipelineJob, PipelineStage, RunOutcome,
};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::FileOptions;

const NAMESPACE: &str = "http://www.fda.gov/cdrh/gudid";

/// Namespaced export document with one device per id
fn export_document(ids: &[&str]) -> String {
    let devices: String = ids
        .iter()
        .map(|id| {
            format!(
                "<device><identifiers><identifier><deviceId>{id}</deviceId></identifier></identifiers>\
                 <versionModelNumber>M{id}</versionModelNumber><companyName>Maker {id}</companyName>\
                 <singleUse>true</singleUse></device>"
            )
        })
        .collect();
    format!(r#"<?xml version="1.0"?><gudid xmlns="{NAMESPACE}">{devices}</gudid>"#)
}

/// Zip the given `(name, content)` entries into memory
fn zip_bytes(entries: &[(String, String)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Archive with `files` XML files of `per_file` devices each
fn archive_entries(files: usize, per_file: usize) -> Vec<(String, String)> {
    (0..files)
        .map(|f| {
            let ids: Vec<String> = (0..per_file).map(|d| format!("{f:02}{d:03}")).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            (format!("part_{f:02}.xml"), export_document(&refs))
        })
        .collect()
}

fn write_archive(dir: &Path, entries: &[(String, String)]) -> PathBuf {
    let archive = dir.join("export.zip");
    std::fs::write(&archive, zip_bytes(entries)).unwrap();
    archive
}

fn local_job(work_dir: &Path, archive: &Path, output: PathBuf) -> PipelineJob {
    PipelineJob::new(
        ArchiveSource::Local {
            path: archive.to_path_buf(),
        },
        work_dir,
        output,
    )
}

/// Download mode saves the archive in the extract directory and writes all rows
#[tokio::test]
async fn test_download_run_end_to_end() {
    let body = zip_bytes(&archive_entries(3, 4));
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/release/full.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let work_dir = TempDir::new().unwrap();
    let output = work_dir.path().join("devices.csv");
    let job = PipelineJob::new(
        ArchiveSource::Download {
            url: format!("{}/release/full.zip", server.uri()),
        },
        work_dir.path(),
        output.clone(),
    );
    let sink = Arc::new(RecordingProgress::new());

    let mut pipeline = Pipeline::new(job, Config::default()).with_progress(sink.clone());
    let outcome = pipeline.run().await;

    let RunOutcome::Done { summary } = outcome else {
        panic!("expected done, got {}", outcome);
    };
    assert_eq!(summary.bytes_downloaded, body.len() as u64);
    assert_eq!(summary.xml_files, 3);
    assert_eq!(summary.rows_written, 12);

    let saved = work_dir.path().join("extract").join("downloaded.zip");
    assert_eq!(std::fs::read(saved).unwrap(), body);

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        header,
        vec![
            "deviceId",
            "versionModelNumber",
            "catalogNumber",
            "dunsNumber",
            "companyName",
            "deviceDescription",
            "singleUse",
            "lotBatch",
            "serialNumber"
        ]
    );
    let first = reader.records().next().unwrap().unwrap();
    assert_eq!(&first[0], "00000");
    assert_eq!(&first[4], "Maker 00000");
    assert_eq!(&first[2], "");

    assert_eq!(sink.statuses()[0], "Downloading ZIP...");
    assert_eq!(sink.finish_count(), 1);
}

/// Two runs over the same archive produce byte-identical CSV
#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let work_dir = TempDir::new().unwrap();
    let archive = write_archive(work_dir.path(), &archive_entries(6, 5));

    let mut contents = Vec::new();
    for run in 0..2 {
        let output = work_dir.path().join(format!("run{run}.csv"));
        let config = Config::default().with_parse_workers(4);
        let outcome = Pipeline::new(local_job(work_dir.path(), &archive, output.clone()), config)
            .run()
            .await;
        assert!(outcome.is_done());
        contents.push(std::fs::read(&output).unwrap());
    }

    assert_eq!(contents[0], contents[1]);
}

/// N rows with threshold T produce ceil(N/T) files, all full except the last
#[tokio::test]
async fn test_split_law() {
    let work_dir = TempDir::new().unwrap();
    let archive = write_archive(work_dir.path(), &archive_entries(1, 7));
    let output = work_dir.path().join("out").join("devices.csv");

    let config = Config::default().with_csv_chunk_rows(3);
    let outcome = Pipeline::new(local_job(work_dir.path(), &archive, output), config)
        .run()
        .await;

    let RunOutcome::Done { summary } = outcome else {
        panic!("expected done");
    };
    let rows: Vec<usize> = summary.outputs.iter().map(|f| f.rows).collect();
    assert_eq!(rows, vec![3, 3, 1]);

    for (n, expected) in [(1, 3), (2, 3), (3, 1)] {
        let path = work_dir.path().join("out").join(format!("devices_{n}.csv"));
        let mut reader = csv::Reader::from_path(path).unwrap();
        assert_eq!(reader.records().count(), expected);
    }
}

/// Cleanup removes the downloaded archive and extracted XML after a run
#[tokio::test]
async fn test_cleanup_after_download_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(&archive_entries(2, 1))))
        .mount(&server)
        .await;

    let work_dir = TempDir::new().unwrap();
    let extract_dir = work_dir.path().join("extract");
    assert!(matches!(
        clean_extract_dir(&extract_dir, "downloaded.zip").unwrap(),
        CleanupReport::NothingToClean { .. }
    ));

    let job = PipelineJob::new(
        ArchiveSource::Download { url: server.uri() },
        work_dir.path(),
        work_dir.path().join("devices.csv"),
    );
    assert!(Pipeline::new(job, Config::default()).run().await.is_done());

    let report = clean_extract_dir(&extract_dir, "downloaded.zip").unwrap();
    assert_eq!(
        report,
        CleanupReport::Cleaned {
            deleted: 3,
            dir: extract_dir.clone()
        }
    );
    assert!(work_dir.path().join("devices.csv").exists());
}

/// Cancelling before the first piece stops in acquisition with no CSV
#[tokio::test]
async fn test_cancelled_download_writes_no_csv() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64 * 1024]))
        .mount(&server)
        .await;

    let work_dir = TempDir::new().unwrap();
    let output = work_dir.path().join("devices.csv");
    let token = CancellationToken::new();
    let job = PipelineJob::new(
        ArchiveSource::Download { url: server.uri() },
        work_dir.path(),
        output.clone(),
    )
    .with_cancellation_token(token.clone());
    token.cancel();

    let sink = Arc::new(RecordingProgress::new());
    let mut pipeline = Pipeline::new(job, Config::default()).with_progress(sink.clone());
    let outcome = pipeline.run().await;

    let RunOutcome::Cancelled { stage, summary } = &outcome else {
        panic!("expected cancellation, got {}", outcome);
    };
    assert_eq!(*stage, PipelineStage::Acquiring);
    let partial = work_dir.path().join("extract").join("downloaded.zip");
    assert!(std::fs::metadata(partial).unwrap().len() <= summary.bytes_downloaded);
    assert!(!output.exists());
    assert!(sink.statuses().contains(&"Cancelled during download".to_string()));
    assert_eq!(sink.finish_count(), 1);
}

/// Progress sink that requests cancellation after a number of download pieces
struct CancelAfterPieces {
    after: u64,
    pieces: AtomicU64,
    token: CancellationToken,
    inner: RecordingProgress,
}

impl ProgressSink for CancelAfterPieces {
    fn status(&self, message: &str) {
        self.inner.status(message);
    }

    fn progress(&self, current: u64, max: Option<u64>) {
        self.inner.progress(current, max);
        if self.pieces.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
            self.token.cancel();
        }
    }

    fn finish(&self, outcome: &RunOutcome) {
        self.inner.finish(outcome);
    }
}

/// Cancelling part way through a download keeps exactly the bytes received
#[tokio::test]
async fn test_download_cancelled_mid_stream_keeps_partial_archive() {
    let body_len = 64 * 1024u64;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; body_len as usize]))
        .mount(&server)
        .await;

    let work_dir = TempDir::new().unwrap();
    let output = work_dir.path().join("devices.csv");
    let token = CancellationToken::new();
    let job = PipelineJob::new(
        ArchiveSource::Download { url: server.uri() },
        work_dir.path(),
        output.clone(),
    )
    .with_cancellation_token(token.clone());

    let sink = Arc::new(CancelAfterPieces {
        after: 2,
        pieces: AtomicU64::new(0),
        token,
        inner: RecordingProgress::new(),
    });
    let mut pipeline = Pipeline::new(job, Config::default()).with_progress(sink.clone());
    let outcome = pipeline.run().await;

    let RunOutcome::Cancelled { stage, summary } = &outcome else {
        panic!("expected cancellation, got {}", outcome);
    };
    assert_eq!(*stage, PipelineStage::Acquiring);
    assert_eq!(outcome.exit_code(), 130);

    let partial = work_dir.path().join("extract").join("downloaded.zip");
    let on_disk = std::fs::metadata(partial).unwrap().len();
    assert!(on_disk > 0);
    assert_eq!(on_disk, summary.bytes_downloaded);
    assert!(summary.bytes_downloaded < body_len);
    assert!(!output.exists());

    let statuses = sink.inner.statuses();
    assert_eq!(statuses.last().unwrap(), "Cancelled during download");
    assert!(!statuses.contains(&"Extracting ZIP...".to_string()));
    assert_eq!(sink.inner.finish_count(), 1);
}

/// A server error fails the run in acquisition
#[tokio::test]
async fn test_server_error_fails_acquisition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let work_dir = TempDir::new().unwrap();
    let job = PipelineJob::new(
        ArchiveSource::Download { url: server.uri() },
        work_dir.path(),
        work_dir.path().join("devices.csv"),
    );

    let outcome = Pipeline::new(job, Config::default()).run().await;
    match outcome {
        RunOutcome::Failed { stage, error } => {
            assert_eq!(stage, PipelineStage::Acquiring);
            assert!(matches!(error, Error::Acquisition { .. }));
        }
        other => panic!("expected failure, got {}", other),
    }
}
