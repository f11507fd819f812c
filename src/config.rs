//! Configuration management and validation.
//!
//! Provides configuration structures for pipeline parameters, worker pool
//! sizing, and logging, loaded in layers: built-in defaults, then an optional
//! TOML file, then command-line overrides applied by the CLI.

use crate::app::services::device_parser::ParseProfile;
use crate::constants::{
    DEFAULT_CSV_CHUNK_ROWS, DEFAULT_DOWNLOAD_CHUNK_SIZE, DEFAULT_LOG_LEVEL,
    DOWNLOADED_ARCHIVE_NAME, EXTRACT_DIR_NAME, FALLBACK_PARSE_WORKERS, LOG_FILE_PREFIX,
    MAX_PARSE_WORKERS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pipeline behaviour settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Schema variant used to read device records
    pub profile: ParseProfile,

    /// Maximum rows per CSV file before output is split
    pub csv_chunk_rows: usize,

    /// Download body is written in pieces of at most this many bytes
    pub download_chunk_size: usize,

    /// File name of a downloaded archive inside the extract directory
    pub archive_file_name: String,

    /// Name of the extract subdirectory under the working directory
    pub extract_dir_name: String,

    /// Fail the run when every discovered XML file fails to parse
    pub escalate_all_failed: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            profile: ParseProfile::Gudid,
            csv_chunk_rows: DEFAULT_CSV_CHUNK_ROWS,
            download_chunk_size: DEFAULT_DOWNLOAD_CHUNK_SIZE,
            archive_file_name: DOWNLOADED_ARCHIVE_NAME.to_string(),
            extract_dir_name: EXTRACT_DIR_NAME.to_string(),
            escalate_all_failed: true,
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Parse workers; `None` uses the available hardware concurrency
    pub parse_workers: Option<usize>,
}

impl PerformanceConfig {
    /// Resolve the effective worker count
    pub fn effective_parse_workers(&self) -> usize {
        match self.parse_workers {
            Some(workers) => workers,
            None => match num_cpus::get() {
                0 => FALLBACK_PARSE_WORKERS,
                cores => cores,
            },
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when RUST_LOG is unset
    pub level: String,

    /// Prefix of the per-run log file name
    pub log_file_prefix: String,

    /// Write the per-run log file into the working directory
    pub write_log_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            log_file_prefix: LOG_FILE_PREFIX.to_string(),
            write_log_file: true,
        }
    }
}

/// Global configuration for GUDID processing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Default location of the user configuration file
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("gudid-processor").join("config.toml"))
            .ok_or_else(|| Error::configuration("Could not determine config directory"))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(format!("Failed to read config file {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!(
                "Invalid config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Defaults overlaid with the given file when present
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let config = match config_file {
            Some(path) => {
                debug!("Loading config file: {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration with a custom parse profile
    pub fn with_profile(mut self, profile: ParseProfile) -> Self {
        self.pipeline.profile = profile;
        self
    }

    /// Create configuration with a fixed worker count
    pub fn with_parse_workers(mut self, workers: usize) -> Self {
        self.performance.parse_workers = Some(workers);
        self
    }

    /// Create configuration with a custom CSV split threshold
    pub fn with_csv_chunk_rows(mut self, rows: usize) -> Self {
        self.pipeline.csv_chunk_rows = rows;
        self
    }

    /// Keep runs where every file failed as successful header-only output
    pub fn without_all_failed_escalation(mut self) -> Self {
        self.pipeline.escalate_all_failed = false;
        self
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.csv_chunk_rows == 0 {
            return Err(Error::configuration("csv_chunk_rows must be greater than 0"));
        }

        if self.pipeline.download_chunk_size == 0 {
            return Err(Error::configuration(
                "download_chunk_size must be greater than 0",
            ));
        }

        if self.pipeline.archive_file_name.trim().is_empty() {
            return Err(Error::configuration("archive_file_name cannot be empty"));
        }

        if self.pipeline.extract_dir_name.trim().is_empty() {
            return Err(Error::configuration("extract_dir_name cannot be empty"));
        }

        if let Some(workers) = self.performance.parse_workers {
            if workers == 0 {
                return Err(Error::configuration(
                    "Number of parse workers must be greater than 0",
                ));
            }
            if workers > MAX_PARSE_WORKERS {
                return Err(Error::configuration(format!(
                    "Number of parse workers cannot exceed {}",
                    MAX_PARSE_WORKERS
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.pipeline.csv_chunk_rows, 500_000);
        assert_eq!(config.pipeline.download_chunk_size, 8192);
        assert_eq!(config.pipeline.archive_file_name, "downloaded.zip");
        assert_eq!(config.pipeline.extract_dir_name, "extract");
        assert_eq!(config.pipeline.profile, ParseProfile::Gudid);
        assert!(config.pipeline.escalate_all_failed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_workers_defaults_to_hardware() {
        let config = PerformanceConfig::default();
        assert!(config.effective_parse_workers() >= 1);

        let config = PerformanceConfig {
            parse_workers: Some(3),
        };
        assert_eq!(config.effective_parse_workers(), 3);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(Config::default().with_csv_chunk_rows(0).validate().is_err());
        assert!(Config::default().with_parse_workers(0).validate().is_err());
        assert!(Config::default().with_parse_workers(10_000).validate().is_err());

        let mut config = Config::default();
        config.pipeline.download_chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_toml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[pipeline]\nprofile = \"unqualified\"\ncsv_chunk_rows = 1000\n\n[performance]\nparse_workers = 2"
        )
        .unwrap();

        let config = Config::load_layered(Some(file.path())).unwrap();
        assert_eq!(config.pipeline.profile, ParseProfile::Unqualified);
        assert_eq!(config.pipeline.csv_chunk_rows, 1000);
        assert_eq!(config.pipeline.download_chunk_size, 8192);
        assert_eq!(config.performance.parse_workers, Some(2));
        assert!(config.logging.write_log_file);
    }

    #[test]
    fn test_load_invalid_toml_is_configuration_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline\ncsv_chunk_rows = ").unwrap();

        let result = Config::load_layered(Some(file.path()));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_load_layered_without_file_uses_defaults() {
        let config = Config::load_layered(None).unwrap();
        assert_eq!(config, Config::default());
    }
}
