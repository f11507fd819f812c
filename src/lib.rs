//! GUDID Processor Library
//!
//! A Rust library for converting FDA GUDID (Global Unique Device Identification
//! Database) device exports from zipped XML into flat CSV files.
//!
//! This library provides tools for:
//! - Acquiring the export archive by streaming download or from a local path
//! - Extracting the archive into a working directory
//! - Parsing `<device>` records with a declarative field-path table
//! - Parsing all extracted files concurrently with per-file failure isolation
//! - Writing CSV output split into bounded chunks
//! - Cooperative cancellation and progress reporting across the whole run

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod pipeline;
    pub mod services {
        pub mod archive_acquirer;
        pub mod archive_extractor;
        pub mod cleanup;
        pub mod csv_writer;
        pub mod device_parser;
        pub mod parse_coordinator;
        pub mod progress;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{ArchiveSource, DeviceRecord, PipelineJob, PipelineStage};
pub use app::pipeline::{Pipeline, RunOutcome, RunSummary};
pub use app::services::device_parser::ParseProfile;
pub use app::services::progress::{NullProgress, ProgressSink};
pub use config::Config;

use std::path::{Path, PathBuf};

/// Result type alias for the GUDID processor
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for GUDID processing operations
///
/// `Parse` is the only recoverable variant: it is scoped to a single XML file
/// and never aborts a batch. Every other variant halts the pipeline.
/// Cancellation is not represented here; stages report it through their
/// outcome types.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Network or local-file failure while obtaining the archive
    #[error("Acquisition error for '{source_ref}': {message}")]
    Acquisition {
        source_ref: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Local archive path missing or not a regular file
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Corrupt or unsupported archive
    #[error("Extraction error for archive '{}': {message}", archive.display())]
    Extraction {
        archive: PathBuf,
        message: String,
        #[source]
        source: Option<zip::result::ZipError>,
    },

    /// A single malformed XML file
    #[error("Parse error in file '{}': {message}", file.display())]
    Parse {
        file: PathBuf,
        message: String,
        #[source]
        source: Option<quick_xml::Error>,
    },

    /// Every discovered XML file failed to parse
    #[error("All {failed} XML files failed to parse")]
    AllFilesFailed { failed: usize },

    /// I/O failure while emitting CSV output
    #[error("CSV write error for '{}': {message}", path.display())]
    Write {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Create an acquisition error with an optional underlying cause
    pub fn acquisition(
        source_ref: impl Into<String>,
        message: impl Into<String>,
        source: Option<reqwest::Error>,
    ) -> Self {
        Self::Acquisition {
            source_ref: source_ref.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a not-found error
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create an extraction error
    pub fn extraction(
        archive: impl AsRef<Path>,
        message: impl Into<String>,
        source: Option<zip::result::ZipError>,
    ) -> Self {
        Self::Extraction {
            archive: archive.as_ref().to_path_buf(),
            message: message.into(),
            source,
        }
    }

    /// Create a parse error scoped to one file
    pub fn parse(
        file: impl AsRef<Path>,
        message: impl Into<String>,
        source: Option<quick_xml::Error>,
    ) -> Self {
        Self::Parse {
            file: file.as_ref().to_path_buf(),
            message: message.into(),
            source,
        }
    }

    /// Create an all-files-failed error
    pub fn all_files_failed(failed: usize) -> Self {
        Self::AllFilesFailed { failed }
    }

    /// Create a CSV write error
    pub fn write(
        path: impl AsRef<Path>,
        message: impl Into<String>,
        source: Option<csv::Error>,
    ) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
            source,
        }
    }

    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the error only affects a single file and the batch may continue
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_parse_errors_are_recoverable() {
        assert!(Error::parse("a.xml", "bad", None).is_recoverable());
        assert!(!Error::not_found("missing.zip").is_recoverable());
        assert!(!Error::extraction("a.zip", "corrupt", None).is_recoverable());
        assert!(!Error::write("out.csv", "disk full", None).is_recoverable());
        assert!(!Error::all_files_failed(3).is_recoverable());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let error = Error::parse("/tmp/x/devices.xml", "unexpected end of document", None);
        let message = error.to_string();
        assert!(message.contains("devices.xml"));
        assert!(message.contains("unexpected end of document"));

        let error = Error::acquisition("https://example.test/a.zip", "HTTP 404 Not Found", None);
        assert!(error.to_string().contains("HTTP 404"));
    }
}
