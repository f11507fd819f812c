//! Pipeline orchestration
//!
//! Sequences acquisition, extraction, parsing and writing for one job,
//! tracking the stage state machine and reporting status through the
//! configured [`ProgressSink`]. Every run ends in exactly one of `Done`,
//! `Cancelled` or `Failed`, and the sink's `finish` is called exactly once
//! with that outcome.
//!
//! Cancellation is observed only inside acquisition (per download piece) and
//! parsing (per file dispatch and per drained completion). Extraction and
//! writing run to completion once started.

use crate::app::models::{PipelineJob, PipelineStage};
use crate::app::services::archive_acquirer::{AcquireOutcome, ArchiveAcquirer};
use crate::app::services::archive_extractor::{discover_xml_files, extract_archive};
use crate::app::services::csv_writer::{CsvWriter, WrittenFile};
use crate::app::services::parse_coordinator::{ParseCoordinator, ParseOutcome};
use crate::app::services::progress::{NullProgress, ProgressSink};
use crate::config::Config;
use crate::constants::BYTES_PER_MB;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Statistics collected over a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Bytes streamed from the network, 0 for local archives
    pub bytes_downloaded: u64,
    /// Sum of uncompressed entry sizes
    pub decompressed_bytes: u64,
    pub xml_files: usize,
    pub files_parsed: usize,
    /// Files that failed to parse with their error text
    pub failures: Vec<(PathBuf, String)>,
    pub rows_written: usize,
    pub outputs: Vec<WrittenFile>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn files_failed(&self) -> usize {
        self.failures.len()
    }
}

/// Terminal result of a run
#[derive(Debug)]
pub enum RunOutcome {
    Done {
        summary: RunSummary,
    },
    /// Cancellation observed in `stage`; no CSV was written
    Cancelled {
        stage: PipelineStage,
        summary: RunSummary,
    },
    /// `error` halted the run while in `stage`
    Failed {
        stage: PipelineStage,
        error: Error,
    },
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, RunOutcome::Done { .. })
    }

    /// The stage the state machine ended in
    pub fn terminal_stage(&self) -> PipelineStage {
        match self {
            RunOutcome::Done { .. } => PipelineStage::Done,
            RunOutcome::Cancelled { .. } => PipelineStage::Cancelled,
            RunOutcome::Failed { .. } => PipelineStage::Failed,
        }
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Done { .. } => 0,
            RunOutcome::Cancelled { .. } => 130,
            RunOutcome::Failed { .. } => 1,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Done { summary } => write!(
                f,
                "done: {} rows written to {} file(s)",
                summary.rows_written,
                summary.outputs.len()
            ),
            RunOutcome::Cancelled { stage, .. } => write!(f, "cancelled during {}", stage),
            RunOutcome::Failed { stage, error } => {
                write!(f, "failed during {}: {}", stage, error)
            }
        }
    }
}

/// How the stage sequence ended when no error was raised
enum Flow {
    Completed,
    Cancelled,
}

/// Orchestrator for a single pipeline job
pub struct Pipeline {
    job: PipelineJob,
    config: Config,
    progress: Arc<dyn ProgressSink>,
    stage: PipelineStage,
    history: Vec<PipelineStage>,
}

impl Pipeline {
    /// Create a pipeline that reports to nothing
    pub fn new(job: PipelineJob, config: Config) -> Self {
        Self {
            job,
            config,
            progress: Arc::new(NullProgress),
            stage: PipelineStage::Idle,
            history: vec![PipelineStage::Idle],
        }
    }

    /// Report status and progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn job(&self) -> &PipelineJob {
        &self.job
    }

    /// Current stage
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Every stage entered so far, starting with `Idle`
    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    /// Run the job to a terminal outcome
    pub async fn run(&mut self) -> RunOutcome {
        let start_time = Instant::now();
        info!("=== Starting processing ===");
        info!("Source: {}", self.job.source);

        let mut summary = RunSummary::default();
        let outcome = match self.execute(&mut summary).await {
            Ok(Flow::Completed) => {
                self.advance(PipelineStage::Done);
                summary.elapsed = start_time.elapsed();
                self.progress.status(&format!(
                    "Done! Saved to {}",
                    self.job.output_path.display()
                ));
                info!(
                    "=== Processing complete: {} rows in {:.2}s ===",
                    summary.rows_written,
                    summary.elapsed.as_secs_f64()
                );
                RunOutcome::Done { summary }
            }
            Ok(Flow::Cancelled) => {
                let stage = self.stage;
                self.advance(PipelineStage::Cancelled);
                summary.elapsed = start_time.elapsed();
                warn!("Run cancelled during {}", stage);
                RunOutcome::Cancelled { stage, summary }
            }
            Err(error) => {
                let stage = self.stage;
                error!("Processing failed during {}: {}", stage, error);
                self.progress.status(failure_status(&error));
                self.advance(PipelineStage::Failed);
                RunOutcome::Failed { stage, error }
            }
        };

        self.progress.finish(&outcome);
        outcome
    }

    async fn execute(&mut self, summary: &mut RunSummary) -> Result<Flow> {
        self.job.prepare_directories()?;
        let settings = self.config.pipeline.clone();
        let token = self.job.cancellation_token.clone();

        self.advance(PipelineStage::Acquiring);
        let acquirer = ArchiveAcquirer::new(settings.download_chunk_size, settings.archive_file_name);
        let archive_path = match acquirer
            .acquire(
                &self.job.source,
                &self.job.extract_dir,
                &token,
                self.progress.as_ref(),
            )
            .await?
        {
            AcquireOutcome::Ready {
                path,
                bytes_downloaded,
            } => {
                summary.bytes_downloaded = bytes_downloaded;
                path
            }
            AcquireOutcome::Cancelled {
                bytes_downloaded, ..
            } => {
                summary.bytes_downloaded = bytes_downloaded;
                return Ok(Flow::Cancelled);
            }
        };

        self.advance(PipelineStage::Extracting);
        self.progress.status("Extracting ZIP...");
        let extract_dir = self.job.extract_dir.clone();
        let archive = archive_path.clone();
        let extraction = tokio::task::spawn_blocking(move || extract_archive(&archive, &extract_dir))
            .await
            .map_err(|e| {
                Error::extraction(&archive_path, format!("Extraction task failed: {}", e), None)
            })??;
        summary.decompressed_bytes = extraction.total_uncompressed_bytes;
        self.progress.status(&format!(
            "Extracted: {:.2} MB",
            extraction.total_uncompressed_bytes as f64 / BYTES_PER_MB
        ));

        self.advance(PipelineStage::Parsing);
        self.progress.status("Parsing XML files...");
        let files = discover_xml_files(&self.job.extract_dir)?;
        summary.xml_files = files.len();
        info!("Found {} XML files", files.len());

        let workers = self.config.performance.effective_parse_workers();
        let coordinator = ParseCoordinator::new(settings.profile, workers);
        let report = match coordinator
            .parse_files(files, &token, self.progress.as_ref())
            .await?
        {
            ParseOutcome::Completed(report) => report,
            ParseOutcome::Cancelled { files_completed } => {
                debug!("Discarding rows from {} parsed files", files_completed);
                return Ok(Flow::Cancelled);
            }
        };

        summary.files_parsed = report.files_parsed;
        summary.failures = report
            .failures
            .iter()
            .map(|failure| (failure.file.clone(), failure.error.to_string()))
            .collect();

        if report.all_files_failed() {
            if settings.escalate_all_failed {
                return Err(Error::all_files_failed(report.failures.len()));
            }
            warn!("All {} XML files failed to parse", report.failures.len());
        }

        self.advance(PipelineStage::Writing);
        self.progress.status("Writing CSV...");
        let writer = CsvWriter::new(settings.profile, settings.csv_chunk_rows);
        let records = report.records;
        let output_path = self.job.output_path.clone();
        let written = tokio::task::spawn_blocking(move || writer.write(&records, &output_path))
            .await
            .map_err(|e| {
                Error::write(
                    &self.job.output_path,
                    format!("Write task failed: {}", e),
                    None,
                )
            })??;

        summary.rows_written = written.iter().map(|file| file.rows).sum();
        summary.outputs = written;
        Ok(Flow::Completed)
    }

    fn advance(&mut self, next: PipelineStage) {
        if !self.stage.can_transition_to(next) {
            warn!("Unexpected stage transition {} -> {}", self.stage, next);
        }
        info!("Stage: {} -> {}", self.stage, next);
        self.stage = next;
        self.history.push(next);
    }
}

/// Status text shown when a run fails
fn failure_status(error: &Error) -> &'static str {
    match error {
        Error::NotFound { .. } => "Invalid local ZIP path",
        Error::Acquisition { .. } => "Download failed",
        Error::Extraction { .. } => "Extraction failed",
        Error::AllFilesFailed { .. } => "All XML files failed to parse",
        Error::Write { .. } => "CSV write failed",
        _ => "Error",
    }
}
