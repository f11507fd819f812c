//! Removal of run artifacts from the extract directory

use crate::constants::XML_EXTENSION;
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Result of a cleanup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupReport {
    /// No extract directory exists yet
    NothingToClean { dir: PathBuf },
    Cleaned { deleted: usize, dir: PathBuf },
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupReport::NothingToClean { dir } => write!(
                f,
                "Nothing to clean: no extract directory at {}. Run the tool first.",
                dir.display()
            ),
            CleanupReport::Cleaned { deleted, dir } => {
                write!(f, "Deleted {} file(s) from: {}", deleted, dir.display())
            }
        }
    }
}

/// Delete the downloaded archive and top-level `.xml` files from `extract_dir`
///
/// Files that cannot be removed are logged and skipped; they do not count
/// towards `deleted`.
pub fn clean_extract_dir(extract_dir: &Path, archive_file_name: &str) -> Result<CleanupReport> {
    if !extract_dir.is_dir() {
        warn!("No extract directory available: {}", extract_dir.display());
        return Ok(CleanupReport::NothingToClean {
            dir: extract_dir.to_path_buf(),
        });
    }

    let mut deleted = 0usize;
    for entry in WalkDir::new(extract_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            Error::io(
                format!("Failed to list directory {}", extract_dir.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;

        if !entry.file_type().is_file() || !is_run_artifact(entry.path(), archive_file_name) {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => deleted += 1,
            Err(e) => error!("Error deleting file {}: {}", entry.path().display(), e),
        }
    }

    info!("Deleted {} file(s) from {}", deleted, extract_dir.display());
    Ok(CleanupReport::Cleaned {
        deleted,
        dir: extract_dir.to_path_buf(),
    })
}

fn is_run_artifact(path: &Path, archive_file_name: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name == archive_file_name
        || path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(XML_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_is_nothing_to_clean() {
        let temp_dir = TempDir::new().unwrap();
        let extract = temp_dir.path().join("extract");

        let report = clean_extract_dir(&extract, "downloaded.zip").unwrap();
        assert_eq!(report, CleanupReport::NothingToClean { dir: extract });
        assert!(report.to_string().starts_with("Nothing to clean"));
    }

    #[test]
    fn test_deletes_archive_and_xml_only() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in ["downloaded.zip", "a.xml", "b.XML", "keep.csv", "other.zip"] {
            std::fs::write(dir.join(name), "x").unwrap();
        }
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub").join("nested.xml"), "x").unwrap();

        let report = clean_extract_dir(dir, "downloaded.zip").unwrap();

        assert_eq!(
            report,
            CleanupReport::Cleaned {
                deleted: 3,
                dir: dir.to_path_buf()
            }
        );
        assert!(dir.join("keep.csv").exists());
        assert!(dir.join("other.zip").exists());
        assert!(dir.join("sub").join("nested.xml").exists());
        assert!(!dir.join("a.xml").exists());
    }

    #[test]
    fn test_second_clean_deletes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.xml"), "x").unwrap();

        clean_extract_dir(temp_dir.path(), "downloaded.zip").unwrap();
        let report = clean_extract_dir(temp_dir.path(), "downloaded.zip").unwrap();
        assert!(matches!(report, CleanupReport::Cleaned { deleted: 0, .. }));
    }
}
