//! Core data models for GUDID device processing
//!
//! This module contains the row type produced by the parser, the per-file
//! parse outcome collected by the coordinator, and the ephemeral job state
//! owned by the pipeline orchestrator for the duration of one run.

use crate::constants::EXTRACT_DIR_NAME;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The nine output fields of a device row, in declared column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceField {
    DeviceId,
    VersionModelNumber,
    CatalogNumber,
    DunsNumber,
    /// `companyName` in the namespaced schema, `companyNumber` in the unqualified one
    Company,
    DeviceDescription,
    SingleUse,
    LotBatch,
    SerialNumber,
}

impl DeviceField {
    /// All fields in column order
    pub const ALL: [DeviceField; 9] = [
        DeviceField::DeviceId,
        DeviceField::VersionModelNumber,
        DeviceField::CatalogNumber,
        DeviceField::DunsNumber,
        DeviceField::Company,
        DeviceField::DeviceDescription,
        DeviceField::SingleUse,
        DeviceField::LotBatch,
        DeviceField::SerialNumber,
    ];

    /// Zero-based column position
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One flattened `<device>` element
///
/// Every field is nullable. A missing element and an element whose text is
/// empty after trimming are both stored as `None`; present values are trimmed.
/// No uniqueness is enforced, duplicates across files are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: Option<String>,
    pub version_model_number: Option<String>,
    pub catalog_number: Option<String>,
    pub duns_number: Option<String>,
    pub company: Option<String>,
    pub device_description: Option<String>,
    pub single_use: Option<String>,
    pub lot_batch: Option<String>,
    pub serial_number: Option<String>,
}

impl DeviceRecord {
    /// Create an empty record with every field null
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw element text for a field, applying the trim/null rule
    pub fn set_text(&mut self, field: DeviceField, raw: &str) {
        *self.slot_mut(field) = normalize_text(raw);
    }

    /// Get the value of a field
    pub fn get(&self, field: DeviceField) -> Option<&str> {
        match field {
            DeviceField::DeviceId => self.device_id.as_deref(),
            DeviceField::VersionModelNumber => self.version_model_number.as_deref(),
            DeviceField::CatalogNumber => self.catalog_number.as_deref(),
            DeviceField::DunsNumber => self.duns_number.as_deref(),
            DeviceField::Company => self.company.as_deref(),
            DeviceField::DeviceDescription => self.device_description.as_deref(),
            DeviceField::SingleUse => self.single_use.as_deref(),
            DeviceField::LotBatch => self.lot_batch.as_deref(),
            DeviceField::SerialNumber => self.serial_number.as_deref(),
        }
    }

    /// Cell values in column order, null fields rendered as empty cells
    pub fn to_row(&self) -> [&str; 9] {
        DeviceField::ALL.map(|field| self.get(field).unwrap_or(""))
    }

    /// Whether every field is null
    pub fn is_blank(&self) -> bool {
        DeviceField::ALL.iter().all(|field| self.get(*field).is_none())
    }

    fn slot_mut(&mut self, field: DeviceField) -> &mut Option<String> {
        match field {
            DeviceField::DeviceId => &mut self.device_id,
            DeviceField::VersionModelNumber => &mut self.version_model_number,
            DeviceField::CatalogNumber => &mut self.catalog_number,
            DeviceField::DunsNumber => &mut self.duns_number,
            DeviceField::Company => &mut self.company,
            DeviceField::DeviceDescription => &mut self.device_description,
            DeviceField::SingleUse => &mut self.single_use,
            DeviceField::LotBatch => &mut self.lot_batch,
            DeviceField::SerialNumber => &mut self.serial_number,
        }
    }
}

/// Trim element text; empty or whitespace-only text becomes null
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Outcome of parsing one XML file: rows or a recorded failure, never both
#[derive(Debug)]
pub enum FileParseResult {
    Parsed {
        file: PathBuf,
        records: Vec<DeviceRecord>,
    },
    Failed {
        file: PathBuf,
        error: Error,
    },
}

impl FileParseResult {
    /// Path of the file this result belongs to
    pub fn file(&self) -> &Path {
        match self {
            FileParseResult::Parsed { file, .. } | FileParseResult::Failed { file, .. } => file,
        }
    }

    /// Number of rows contributed to the aggregate
    pub fn record_count(&self) -> usize {
        match self {
            FileParseResult::Parsed { records, .. } => records.len(),
            FileParseResult::Failed { .. } => 0,
        }
    }
}

/// Where the archive comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// Stream the archive over HTTP
    Download { url: String },
    /// Use an archive already on disk, in place
    Local { path: PathBuf },
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveSource::Download { url } => write!(f, "download {}", url),
            ArchiveSource::Local { path } => write!(f, "local {}", path.display()),
        }
    }
}

/// Pipeline state machine
///
/// `Idle → Acquiring → Extracting → Parsing → Writing → Done | Cancelled | Failed`,
/// strictly sequential with no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Idle,
    Acquiring,
    Extracting,
    Parsing,
    Writing,
    Done,
    Cancelled,
    Failed,
}

impl PipelineStage {
    /// Whether the stage ends a run
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineStage::Done | PipelineStage::Cancelled | PipelineStage::Failed
        )
    }

    /// Whether `next` is a legal transition from this stage
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (Idle, Acquiring) | (Acquiring, Extracting) | (Extracting, Parsing) => true,
            (Parsing, Writing) | (Writing, Done) => true,
            (Acquiring | Parsing, Cancelled) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Acquiring => "acquiring",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Parsing => "parsing",
            PipelineStage::Writing => "writing",
            PipelineStage::Done => "done",
            PipelineStage::Cancelled => "cancelled",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Ephemeral state of one pipeline run
///
/// Created per invocation and dropped when the run terminates. The
/// cancellation token is the only state shared with the caller.
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub source: ArchiveSource,
    pub work_dir: PathBuf,
    pub extract_dir: PathBuf,
    pub output_path: PathBuf,
    pub cancellation_token: CancellationToken,
}

impl PipelineJob {
    /// Create a job extracting into `<work_dir>/extract`
    pub fn new(
        source: ArchiveSource,
        work_dir: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        let work_dir = work_dir.into();
        Self {
            extract_dir: work_dir.join(EXTRACT_DIR_NAME),
            source,
            work_dir,
            output_path: output_path.into(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Use a caller-provided cancellation token
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Use a custom extract subdirectory name
    pub fn with_extract_dir_name(mut self, name: &str) -> Self {
        self.extract_dir = self.work_dir.join(name);
        self
    }

    /// Request cooperative cancellation of the run
    pub fn request_cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Create the extract directory if absent
    pub fn prepare_directories(&self) -> Result<()> {
        if !self.work_dir.is_dir() {
            return Err(Error::configuration(format!(
                "Working directory does not exist: {}",
                self.work_dir.display()
            )));
        }

        std::fs::create_dir_all(&self.extract_dir).map_err(|e| {
            Error::io(
                format!(
                    "Failed to create extract directory {}",
                    self.extract_dir.display()
                ),
                e,
            )
        })?;

        debug!("Extract directory ready: {}", self.extract_dir.display());
        Ok(())
    }
}
