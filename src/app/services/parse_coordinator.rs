//! Parallel parse coordination across extracted XML files
//!
//! One blocking parse task is submitted per file; a semaphore bounds how many
//! run at once. Each task checks the cancellation token before it starts and
//! becomes a no-op when cancellation was requested. Completions are drained in
//! completion order for progress reporting, but rows are assembled in file
//! order so repeated runs over the same archive produce identical output.
//!
//! A file that fails to parse is logged and contributes zero rows. If the
//! token is cancelled while results are still pending, draining stops and
//! every row gathered so far is discarded.

use crate::app::models::{DeviceRecord, FileParseResult};
use crate::app::services::device_parser::{DeviceParser, ParseProfile};
use crate::app::services::progress::ProgressSink;
use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Result of the parse stage
#[derive(Debug)]
pub enum ParseOutcome {
    Completed(ParseReport),
    /// Cancelled while draining; no rows are kept
    Cancelled { files_completed: usize },
}

/// A file that failed to parse
#[derive(Debug)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: Error,
}

/// Aggregated rows and per-file accounting
#[derive(Debug, Default)]
pub struct ParseReport {
    /// Rows of every successfully parsed file, in file then document order
    pub records: Vec<DeviceRecord>,
    pub files_total: usize,
    pub files_parsed: usize,
    pub failures: Vec<FileFailure>,
    pub processing_time: Duration,
}

impl ParseReport {
    /// Whether at least one file existed and none parsed
    pub fn all_files_failed(&self) -> bool {
        self.files_total > 0 && self.files_parsed == 0
    }

    /// Calculate files processed per second
    pub fn files_per_second(&self) -> f64 {
        if self.processing_time.as_secs_f64() > 0.0 {
            self.files_total as f64 / self.processing_time.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Fans out parsing over a bounded worker pool
#[derive(Debug, Clone)]
pub struct ParseCoordinator {
    profile: ParseProfile,
    workers: usize,
}

impl ParseCoordinator {
    /// Create a coordinator running at most `workers` parses at once
    pub fn new(profile: ParseProfile, workers: usize) -> Self {
        Self {
            profile,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Parse every file and aggregate the rows
    pub async fn parse_files(
        &self,
        files: Vec<PathBuf>,
        cancellation_token: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<ParseOutcome> {
        let total = files.len();
        let start_time = Instant::now();
        info!(
            "Parsing {} XML files with {} workers ({} profile)",
            total, self.workers, self.profile
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, file) in files.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let token = cancellation_token.clone();
            let parser = DeviceParser::new(self.profile);

            tasks.spawn(async move {
                // Closed semaphore only happens on shutdown; treat as cancelled
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, FileParseResult::Parsed { file, records: Vec::new() });
                };

                if token.is_cancelled() {
                    return (index, FileParseResult::Parsed { file, records: Vec::new() });
                }

                let path = file.clone();
                let joined = tokio::task::spawn_blocking(move || parser.parse_file(&path)).await;
                (index, file_result(file, joined))
            });
        }

        let mut slots: Vec<Option<FileParseResult>> = (0..total).map(|_| None).collect();
        let mut completed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            if cancellation_token.is_cancelled() {
                tasks.abort_all();
                warn!("Cancelled during parsing after {} of {} files", completed, total);
                progress.status("Cancelled during parsing");
                return Ok(ParseOutcome::Cancelled {
                    files_completed: completed,
                });
            }

            match joined {
                Ok((index, result)) => {
                    match &result {
                        FileParseResult::Parsed { .. } => info!(
                            "Parsed file: {} ({} devices)",
                            result.file().display(),
                            result.record_count()
                        ),
                        FileParseResult::Failed { error, .. } => {
                            error!("Error parsing file {}: {}", result.file().display(), error);
                        }
                    }
                    slots[index] = Some(result);
                }
                Err(join_error) => {
                    error!("Parse task failed to complete: {}", join_error);
                }
            }

            completed += 1;
            progress.progress(completed as u64, Some(total as u64));
            progress.status(&format!("Parsed {}/{} files", completed, total));
        }

        let mut report = ParseReport {
            files_total: total,
            ..Default::default()
        };

        for result in slots.into_iter().flatten() {
            match result {
                FileParseResult::Parsed { records, .. } => {
                    report.files_parsed += 1;
                    report.records.extend(records);
                }
                FileParseResult::Failed { file, error } => {
                    report.failures.push(FileFailure { file, error });
                }
            }
        }

        report.processing_time = start_time.elapsed();
        info!(
            "Parsing complete: {} rows from {} files, {} failed in {:.2}s ({:.1} files/sec)",
            report.records.len(),
            report.files_parsed,
            report.failures.len(),
            report.processing_time.as_secs_f64(),
            report.files_per_second()
        );

        Ok(ParseOutcome::Completed(report))
    }
}

/// Attribute a finished parse task to its file, panics included
fn file_result(
    file: PathBuf,
    joined: std::result::Result<Result<Vec<DeviceRecord>>, JoinError>,
) -> FileParseResult {
    match joined {
        Ok(Ok(records)) => FileParseResult::Parsed { file, records },
        Ok(Err(error)) => FileParseResult::Failed { file, error },
        Err(join_error) => {
            let error = Error::parse(&file, format!("Parse task panicked: {}", join_error), None);
            FileParseResult::Failed { file, error }
        }
    }
}
