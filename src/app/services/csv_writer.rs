//! CSV output for aggregated device rows
//!
//! Rows are written only after parsing has produced the full set. At or below
//! the chunk threshold the output lands at the exact requested path; above it
//! the rows are split into consecutive chunks named `<base>_<n><ext>`, numbered
//! from 1, where every chunk but the last holds exactly `chunk_rows` rows.
//! Zero rows still produce a single header-only file at the requested path.

use crate::app::models::DeviceRecord;
use crate::app::services::device_parser::ParseProfile;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One CSV file produced by a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes device rows using the column names of a parse profile
#[derive(Debug, Clone)]
pub struct CsvWriter {
    profile: ParseProfile,
    chunk_rows: usize,
}

impl CsvWriter {
    pub fn new(profile: ParseProfile, chunk_rows: usize) -> Self {
        Self {
            profile,
            chunk_rows: chunk_rows.max(1),
        }
    }

    /// Write `records` to `output_path`, splitting above the threshold
    pub fn write(&self, records: &[DeviceRecord], output_path: &Path) -> Result<Vec<WrittenFile>> {
        ensure_parent_dir(output_path)?;

        if records.len() <= self.chunk_rows {
            let written = self.write_file(records, output_path)?;
            return Ok(vec![written]);
        }

        let chunk_count = records.len().div_ceil(self.chunk_rows);
        info!(
            "Splitting {} rows into {} files of at most {} rows",
            records.len(),
            chunk_count,
            self.chunk_rows
        );

        records
            .chunks(self.chunk_rows)
            .enumerate()
            .map(|(index, chunk)| self.write_file(chunk, &chunk_path(output_path, index + 1)))
            .collect()
    }

    fn write_file(&self, records: &[DeviceRecord], path: &Path) -> Result<WrittenFile> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| Error::write(path, "Failed to create CSV file", Some(e)))?;

        writer
            .write_record(self.profile.column_names())
            .map_err(|e| Error::write(path, "Failed to write header", Some(e)))?;

        for record in records {
            writer
                .write_record(record.to_row())
                .map_err(|e| Error::write(path, "Failed to write row", Some(e)))?;
        }

        writer.flush().map_err(|e| {
            Error::write(path, format!("Failed to flush CSV file: {}", e), None)
        })?;

        info!("Wrote {} rows to {}", records.len(), path.display());
        Ok(WrittenFile {
            path: path.to_path_buf(),
            rows: records.len(),
        })
    }
}

/// Path of the `n`-th chunk (1-based) for a split output
pub fn chunk_path(output_path: &Path, n: usize) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match output_path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };

    output_path.with_file_name(file_name)
}

fn ensure_parent_dir(output_path: &Path) -> Result<()> {
    match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            debug!("Creating output directory: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::write(
                    output_path,
                    format!("Failed to create output directory {}: {}", parent.display(), e),
                    None,
                )
            })
        }
        _ => Ok(()),
    }
}
