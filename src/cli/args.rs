//! Command-line argument definitions for GUDID processor
//!
//! This module defines the CLI interface using the clap derive API.

use crate::app::models::ArchiveSource;
use crate::app::services::device_parser::ParseProfile;
use crate::constants::MAX_PARSE_WORKERS;
use crate::{Error, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the GUDID device export processor
///
/// Downloads or opens a zipped GUDID XML export, parses every device record,
/// and writes the flattened rows to CSV.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gudid-processor",
    version,
    about = "Convert FDA GUDID device exports from zipped XML to CSV",
    long_about = "Acquires a GUDID export archive (by HTTP download or from a local file), \
                  extracts it into a working directory, parses all device records in parallel, \
                  and writes them to one or more CSV files. Malformed XML files are logged and \
                  skipped; large outputs are split into numbered chunks."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Acquire, extract, parse and write CSV (main command)
    Run(RunArgs),
    /// Delete the downloaded archive and extracted XML files
    Clean(CleanArgs),
}

/// Archive source selector, exactly one of the two must be given
#[derive(Debug, Clone, ClapArgs)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// URL of the zipped export to download
    #[arg(long = "url", value_name = "URL", help = "Download the archive from this URL")]
    pub url: Option<String>,

    /// Path of a zip archive already on disk
    ///
    /// The archive is read in place and never copied.
    #[arg(long = "local", value_name = "FILE", help = "Use a local zip archive")]
    pub local: Option<PathBuf>,
}

impl SourceArgs {
    /// Convert to the pipeline's source selector
    pub fn to_source(&self) -> Result<ArchiveSource> {
        match (&self.url, &self.local) {
            (Some(url), None) => Ok(ArchiveSource::Download { url: url.clone() }),
            (None, Some(path)) => Ok(ArchiveSource::Local { path: path.clone() }),
            _ => Err(Error::configuration(
                "Exactly one of --url or --local must be given",
            )),
        }
    }
}

/// Arguments for the run command
#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Working directory
    ///
    /// Must already exist. An `extract` subdirectory is created inside it and
    /// the per-run log file is written here.
    #[arg(
        short = 'w',
        long = "work-dir",
        value_name = "DIR",
        help = "Working directory for the download, extraction and log file"
    )]
    pub work_dir: PathBuf,

    /// Output CSV path
    ///
    /// Outputs above the chunk threshold are written as `<name>_1.csv`,
    /// `<name>_2.csv`, ... next to this path.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Output CSV file path"
    )]
    pub output: PathBuf,

    /// Schema variant of the export
    #[arg(
        short = 'p',
        long = "profile",
        value_enum,
        help = "XML schema profile (defaults to gudid)"
    )]
    pub profile: Option<ParseProfile>,

    /// Number of parallel parse workers
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        help = "Number of parallel parse workers (defaults to CPU count)"
    )]
    pub workers: Option<usize>,

    /// Maximum rows per CSV file
    #[arg(
        long = "chunk-rows",
        value_name = "ROWS",
        help = "Maximum rows per CSV file before output is split"
    )]
    pub chunk_rows: Option<usize>,

    /// Path to configuration file
    ///
    /// TOML configuration file. If not specified, looks for
    /// `<config dir>/gudid-processor/config.toml`.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Skip writing the per-run log file
    #[arg(long = "no-log-file", help = "Do not write a log file into the working directory")]
    pub no_log_file: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (default: info, -v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Progress bars are hidden.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Arguments for the clean command
#[derive(Debug, Clone, Parser)]
pub struct CleanArgs {
    /// Working directory used by a previous run
    #[arg(
        short = 'w',
        long = "work-dir",
        value_name = "DIR",
        help = "Working directory used by a previous run"
    )]
    pub work_dir: PathBuf,

    /// Path to configuration file
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Enable verbose logging (default: info, -v: debug, -vv: trace)"
    )]
    pub verbose: u8,
}

impl RunArgs {
    /// Validate the run command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.work_dir.is_dir() {
            return Err(Error::configuration(format!(
                "Working directory does not exist: {}",
                self.work_dir.display()
            )));
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(Error::configuration(
                    "Number of workers must be greater than 0",
                ));
            }
            if workers > MAX_PARSE_WORKERS {
                return Err(Error::configuration(format!(
                    "Number of workers cannot exceed {}",
                    MAX_PARSE_WORKERS
                )));
            }
        }

        if self.chunk_rows == Some(0) {
            return Err(Error::configuration(
                "Chunk rows must be greater than 0",
            ));
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(Error::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        self.source.to_source().map(|_| ())
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            verbosity_level(self.verbose)
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

impl CleanArgs {
    pub fn get_log_level(&self) -> &'static str {
        verbosity_level(self.verbose)
    }
}

fn verbosity_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
