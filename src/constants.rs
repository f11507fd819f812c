//! Application constants for GUDID processor
//!
//! This module contains configuration constants, default values,
//! and schema identifiers used throughout the GUDID processor application.

// =============================================================================
// Source Schema
// =============================================================================

/// Namespace URI qualifying every element of the GUDID device export schema
pub const GUDID_NAMESPACE: &str = "http://www.fda.gov/cdrh/gudid";

/// Local name of the element that delimits one device record
pub const DEVICE_ELEMENT: &str = "device";

/// Extension of the XML files parsed after extraction
pub const XML_EXTENSION: &str = "xml";

// =============================================================================
// Working Directory Layout
// =============================================================================

/// Subdirectory of the working directory receiving archive contents
pub const EXTRACT_DIR_NAME: &str = "extract";

/// File name used for a downloaded archive inside the extract directory
pub const DOWNLOADED_ARCHIVE_NAME: &str = "downloaded.zip";

/// Prefix of the per-run log file written into the working directory
pub const LOG_FILE_PREFIX: &str = "gudid-processor";

/// Timestamp format used in per-run log file names
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Download body is written to disk in pieces of at most this many bytes
pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// Maximum number of rows per CSV file before output is split
pub const DEFAULT_CSV_CHUNK_ROWS: usize = 500_000;

/// Worker count used when hardware concurrency cannot be detected
pub const FALLBACK_PARSE_WORKERS: usize = 4;

/// Upper bound accepted for an explicit worker count
pub const MAX_PARSE_WORKERS: usize = 256;

// =============================================================================
// Logging
// =============================================================================

/// Default log level when neither -v nor RUST_LOG is given
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Bytes per mebibyte, used for status text
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
