//! Archive acquisition by streaming download or from a local path
//!
//! Downloads are written to disk piece by piece as they arrive and never
//! buffered whole in memory. Cancellation is checked before every piece is
//! written, so a cancelled download leaves a partial file whose size equals
//! the last reported byte count.

use crate::app::models::ArchiveSource;
use crate::app::services::progress::{ProgressSink, percentage};
use crate::constants::BYTES_PER_MB;
use crate::{Error, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of the acquisition stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Archive is ready at `path`; `bytes_downloaded` is 0 for local archives
    Ready { path: PathBuf, bytes_downloaded: u64 },
    /// Cancelled mid-download; the partial file stays on disk
    Cancelled { path: PathBuf, bytes_downloaded: u64 },
}

/// Obtains the zip archive for a run
#[derive(Debug, Clone)]
pub struct ArchiveAcquirer {
    client: reqwest::Client,
    chunk_size: usize,
    archive_file_name: String,
}

impl ArchiveAcquirer {
    /// Create an acquirer writing downloads in pieces of `chunk_size` bytes
    pub fn new(chunk_size: usize, archive_file_name: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            chunk_size: chunk_size.max(1),
            archive_file_name: archive_file_name.into(),
        }
    }

    /// Acquire the archive from `source` into `extract_dir`
    pub async fn acquire(
        &self,
        source: &ArchiveSource,
        extract_dir: &Path,
        cancellation_token: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<AcquireOutcome> {
        match source {
            ArchiveSource::Download { url } => {
                let destination = extract_dir.join(&self.archive_file_name);
                self.download(url, &destination, cancellation_token, progress)
                    .await
            }
            ArchiveSource::Local { path } => {
                let path = validate_local_archive(path)?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                info!("Using local ZIP file: {}", path.display());
                progress.status(&format!("Using local file: {}", name));
                Ok(AcquireOutcome::Ready {
                    path,
                    bytes_downloaded: 0,
                })
            }
        }
    }

    /// Stream `url` into `destination`
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        cancellation_token: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<AcquireOutcome> {
        info!("Download URL: {}", url);
        progress.status("Downloading ZIP...");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::acquisition(url, format!("Request failed: {}", e), Some(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::acquisition(
                url,
                format!("Server responded with HTTP {}", status),
                None,
            ));
        }

        let total_size = response.content_length().filter(|len| *len > 0);
        debug!("Content length: {:?}", total_size);

        let mut file = File::create(destination).await.map_err(|e| {
            Error::io(
                format!("Failed to create archive file {}", destination.display()),
                e,
            )
        })?;

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                Error::acquisition(url, format!("Download interrupted: {}", e), Some(e))
            })?;

            for piece in chunk.chunks(self.chunk_size) {
                if cancellation_token.is_cancelled() {
                    file.flush().await?;
                    warn!("Cancelled during download after {} bytes", downloaded);
                    progress.status("Cancelled during download");
                    return Ok(AcquireOutcome::Cancelled {
                        path: destination.to_path_buf(),
                        bytes_downloaded: downloaded,
                    });
                }

                file.write_all(piece).await.map_err(|e| {
                    Error::io(
                        format!("Failed to write archive file {}", destination.display()),
                        e,
                    )
                })?;
                downloaded += piece.len() as u64;

                progress.progress(downloaded, total_size);
                progress.status(&download_status(downloaded, total_size));
            }
        }

        file.flush().await?;
        info!(
            "Download complete: {} bytes written to {}",
            downloaded,
            destination.display()
        );

        Ok(AcquireOutcome::Ready {
            path: destination.to_path_buf(),
            bytes_downloaded: downloaded,
        })
    }
}

/// Check a local archive path exists and is a regular file
pub fn validate_local_archive(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        warn!("Invalid local ZIP path: {}", path.display());
        return Err(Error::not_found(path));
    }
    Ok(path.to_path_buf())
}

/// Status text for a running download
pub fn download_status(downloaded: u64, total: Option<u64>) -> String {
    let downloaded_mb = downloaded as f64 / BYTES_PER_MB;
    match (total, percentage(downloaded, total)) {
        (Some(total), Some(percent)) => format!(
            "Downloading... {:.2} MB / {:.2} MB ({:.0}%)",
            downloaded_mb,
            total as f64 / BYTES_PER_MB,
            percent
        ),
        _ => format!("Downloading... {:.2} MB", downloaded_mb),
    }
}
