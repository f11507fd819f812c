//! Shared components for CLI commands
//!
//! Logging setup, configuration loading, the terminal progress sink and
//! report formatting used by more than one command.

use crate::app::pipeline::{RunOutcome, RunSummary};
use crate::app::services::progress::ProgressSink;
use crate::config::Config;
use crate::constants::LOG_TIMESTAMP_FORMAT;
use crate::{Error, Result};
use chrono::{DateTime, Local};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{Subscriber, debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Per-run log file settings
#[derive(Debug, Clone)]
pub struct LogFile {
    pub dir: PathBuf,
    pub prefix: String,
    /// Level for the file only; `-q` never lowers it
    pub level: String,
}

/// File name, without extension, of the log for a run started at `started`
pub fn log_file_stem(prefix: &str, started: DateTime<Local>) -> String {
    format!("{}_{}", prefix, started.format(LOG_TIMESTAMP_FORMAT))
}

/// Path of the log file for a run started at `started`
pub fn log_file_path(dir: &Path, prefix: &str, started: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}.log", log_file_stem(prefix, started)))
}

/// Open `<dir>/<stem>.log` for appending, without rotation
pub fn open_log_appender(dir: &Path, stem: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(stem)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| {
            Error::configuration(format!(
                "Failed to create log file in {}: {}",
                dir.display(),
                e
            ))
        })
}

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("gudid_processor={}", level))
}

/// Plain-text file layer with its own level filter
pub fn file_layer<S, W>(writer: W, level: &str) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .with_timer(fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_writer(writer)
        .with_filter(crate_filter(level))
}

/// Set up structured logging to stderr and, optionally, a per-run log file
///
/// `log_level` and `RUST_LOG` filter stderr only. The file keeps the level in
/// its `LogFile`, so a quiet run still records per-file progress on disk.
/// The returned guard flushes the file writer on drop and must be held for
/// the duration of the run.
pub fn setup_logging(
    log_level: &str,
    quiet: bool,
    log_file: Option<&LogFile>,
) -> Result<Option<WorkerGuard>> {
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter(log_level));

    let (file_output, guard, file_path) = match log_file {
        Some(log_file) => {
            let started = Local::now();
            let stem = log_file_stem(&log_file.prefix, started);
            let appender = open_log_appender(&log_file.dir, &stem)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(file_layer(writer, &log_file.level)),
                Some(guard),
                Some(log_file_path(&log_file.dir, &log_file.prefix, started)),
            )
        }
        None => (None, None, None),
    };

    if quiet {
        // Minimal logging for quiet mode
        tracing_subscriber::registry()
            .with(file_output)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact()
                    .with_filter(stderr_filter),
            )
            .init();
    } else {
        // Standard logging with timestamps
        tracing_subscriber::registry()
            .with(file_output)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr)
                    .with_filter(stderr_filter),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
    if let Some(path) = file_path {
        info!("Log file: {}", path.display());
    }
    Ok(guard)
}

/// Load configuration from the given file, or the default location if it exists
pub fn load_configuration(config_file: Option<&Path>) -> Result<Config> {
    let default_config_path = match config_file {
        Some(_) => None,
        None => Config::default_config_path().ok(),
    };

    let config_file = config_file.or_else(|| {
        default_config_path
            .as_deref()
            .filter(|path| path.exists())
    });

    Config::load_layered(config_file)
}

/// Format a byte count in human-readable units
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Which kind of quantity the bar is currently counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarMode {
    Spinner,
    Bytes,
    Files,
}

/// Progress sink rendering to the terminal with indicatif
pub struct TerminalProgress {
    bar: ProgressBar,
    mode: Mutex<BarMode>,
}

impl TerminalProgress {
    /// Create a sink; a hidden bar still prints the terminal notification
    pub fn new(show_progress: bool) -> Self {
        let bar = if show_progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            mode: Mutex::new(BarMode::Spinner),
        }
    }

    fn switch_mode(&self, mode: BarMode, length: Option<u64>) {
        let Ok(mut current) = self.mode.lock() else {
            return;
        };
        if *current == mode {
            return;
        }

        *current = mode;
        match mode {
            BarMode::Spinner => self.bar.set_style(spinner_style()),
            BarMode::Bytes => self.bar.set_style(bytes_style()),
            BarMode::Files => self.bar.set_style(files_style()),
        }
        self.bar.set_position(0);
        if let Some(length) = length {
            self.bar.set_length(length);
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn status(&self, message: &str) {
        match message {
            "Downloading ZIP..." => self.switch_mode(BarMode::Bytes, None),
            "Extracting ZIP..." => self.switch_mode(BarMode::Spinner, None),
            "Parsing XML files..." => self.switch_mode(BarMode::Files, None),
            _ => {}
        }
        self.bar.set_message(message.to_string());
    }

    fn progress(&self, current: u64, max: Option<u64>) {
        match max {
            Some(max) => {
                if self.bar.length() != Some(max) {
                    self.bar.set_length(max);
                }
            }
            None => self.bar.unset_length(),
        }
        self.bar.set_position(current);
    }

    fn finish(&self, outcome: &RunOutcome) {
        self.bar.finish_and_clear();
        match outcome {
            RunOutcome::Done { summary } => {
                let target = summary
                    .outputs
                    .first()
                    .map(|file| file.path.display().to_string())
                    .unwrap_or_default();
                println!("{} CSV written to: {}", "Done!".green().bold(), target);
            }
            RunOutcome::Cancelled { stage, .. } => {
                println!("{} during {}", "Cancelled".yellow().bold(), stage);
            }
            RunOutcome::Failed { stage, error } => {
                eprintln!("{} during {}: {}", "Failed".red().bold(), stage, error);
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

fn files_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Print the summary of a finished run
pub fn print_run_report(summary: &RunSummary) {
    println!("\n{}", "GUDID Processing Complete".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Processing Summary:");
    if summary.bytes_downloaded > 0 {
        println!("   • Downloaded: {}", format_size(summary.bytes_downloaded));
    }
    println!("   • Extracted: {}", format_size(summary.decompressed_bytes));
    println!("   • XML files found: {}", summary.xml_files);
    println!("   • Files parsed: {}", summary.files_parsed);
    println!("   • Rows written: {}", summary.rows_written);
    println!("   • Processing time: {}", HumanDuration(summary.elapsed));

    if summary.files_failed() > 0 {
        println!(
            "{}",
            format!("   • Files failed: {}", summary.files_failed()).yellow()
        );
        for (file, error) in &summary.failures {
            println!("       {}: {}", file.display(), error);
        }
    }

    if !summary.outputs.is_empty() {
        println!("\nOutput Files:");
        for output in &summary.outputs {
            println!("   • {}: {} rows", output.path.display(), output.rows);
        }
    }

    println!();
}
