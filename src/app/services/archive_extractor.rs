//! Zip archive extraction
//!
//! Unpacks every entry of the acquired archive into the extract directory and
//! reports the total decompressed size. Any failure is surfaced as an
//! extraction error; a half-extracted directory is never used.

use crate::constants::XML_EXTENSION;
use crate::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Result of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Number of entries in the archive, directories included
    pub entries: usize,
    /// Sum of the uncompressed sizes of all entries
    pub total_uncompressed_bytes: u64,
}

/// Extract `archive_path` into `target_dir`
pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<ExtractionSummary> {
    info!(
        "Extracting {} into {}",
        archive_path.display(),
        target_dir.display()
    );

    let file = File::open(archive_path).map_err(|e| {
        Error::extraction(archive_path, format!("Failed to open archive: {}", e), None)
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| {
        Error::extraction(archive_path, format!("Not a readable zip archive: {}", e), Some(e))
    })?;

    let mut total_uncompressed_bytes = 0u64;
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(|e| {
            Error::extraction(
                archive_path,
                format!("Failed to read entry {}: {}", index, e),
                Some(e),
            )
        })?;
        total_uncompressed_bytes += entry.size();
    }

    archive.extract(target_dir).map_err(|e| {
        Error::extraction(archive_path, format!("Extraction failed: {}", e), Some(e))
    })?;

    let summary = ExtractionSummary {
        entries: archive.len(),
        total_uncompressed_bytes,
    };

    info!(
        "Extraction complete: {} entries, {} bytes",
        summary.entries, summary.total_uncompressed_bytes
    );
    Ok(summary)
}

/// List `.xml` files directly inside `dir`, sorted by path
pub fn discover_xml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut xml_files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            Error::io(
                format!("Failed to list directory {}", dir.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;

        if entry.file_type().is_file() && is_xml_file(entry.path()) {
            xml_files.push(entry.into_path());
        }
    }

    // Sort files for consistent processing order
    xml_files.sort();

    debug!("Discovered {} XML files in {}", xml_files.len(), dir.display());
    Ok(xml_files)
}

fn is_xml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(XML_EXTENSION))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    /// Build a zip at `path` holding the given `(name, content)` entries
    pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_reports_uncompressed_size() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("export.zip");
        write_zip(
            &archive,
            &[("a.xml", "<a/>"), ("b.xml", "<bb/>"), ("readme.txt", "hello")],
        );

        let target = temp_dir.path().join("extract");
        std::fs::create_dir_all(&target).unwrap();
        let summary = extract_archive(&archive, &target).unwrap();

        assert_eq!(summary.entries, 3);
        assert_eq!(summary.total_uncompressed_bytes, 4 + 5 + 5);
        assert_eq!(std::fs::read_to_string(target.join("b.xml")).unwrap(), "<bb/>");
    }

    #[test]
    fn test_corrupt_archive_is_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("corrupt.zip");
        std::fs::write(&archive, b"this is not a zip file").unwrap();

        let result = extract_archive(&archive, temp_dir.path());
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_missing_archive_is_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = extract_archive(&temp_dir.path().join("missing.zip"), temp_dir.path());
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_discover_xml_files_top_level_sorted() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["c.xml", "a.XML", "b.xml", "notes.txt", "downloaded.zip"] {
            std::fs::write(temp_dir.path().join(name), "x").unwrap();
        }
        let nested = temp_dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("d.xml"), "x").unwrap();

        let files = discover_xml_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.XML", "b.xml", "c.xml"]);
    }

    #[test]
    fn test_discover_xml_files_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_xml_files(temp_dir.path()).unwrap().is_empty());
    }
}
