//! Discovery of input papers and bookkeeping against existing results.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use walkdir::WalkDir;

use crate::output::result_stem;

/// Errors raised while inspecting input files.
#[derive(Debug, Error)]
pub enum InputError {
    /// File metadata could not be read.
    #[error("failed to inspect {}: {source}", .path.display())]
    Metadata {
        /// File we attempted to inspect.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Basic facts about an input PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFile {
    /// Full path.
    pub path: PathBuf,
    /// File name, e.g. `2301.07041.pdf`.
    pub name: String,
    /// Name used for result files, e.g. `2301.07041`.
    pub stem: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<OffsetDateTime>,
}

/// PDF files directly inside `input_dir`, sorted by path.
///
/// The extension check ignores case. A missing directory yields an empty list and a warning.
pub fn discover_papers(input_dir: &Path) -> Vec<PathBuf> {
    if !input_dir.is_dir() {
        tracing::warn!(dir = %input_dir.display(), "Input directory does not exist");
        return Vec::new();
    }

    let mut papers: Vec<PathBuf> = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(error = %error, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    papers.sort();

    tracing::info!(dir = %input_dir.display(), count = papers.len(), "Discovered PDF papers");
    papers
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Path of the JSON result that processing `pdf` writes into `output_dir`.
pub fn result_path_for(pdf: &Path, output_dir: &Path) -> PathBuf {
    let name = pdf
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}.json", result_stem(&name)))
}

/// True when a JSON result for `pdf` already exists in `output_dir`.
pub fn is_processed(pdf: &Path, output_dir: &Path) -> bool {
    result_path_for(pdf, output_dir).is_file()
}

/// Collect [`PaperFile`] facts for `path`.
pub fn file_info(path: &Path) -> Result<PaperFile, InputError> {
    let metadata = fs::metadata(path).map_err(|source| InputError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(PaperFile {
        path: path.to_path_buf(),
        stem: result_stem(&name),
        name,
        size: metadata.len(),
        modified: metadata.modified().ok().map(OffsetDateTime::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discovers_pdfs_case_insensitively_and_sorted() {
        let dir = tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/d.pdf"), b"x").unwrap();

        let papers = discover_papers(dir.path());
        assert_eq!(
            papers,
            vec![dir.path().join("a.PDF"), dir.path().join("b.pdf")]
        );
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        assert!(discover_papers(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn processed_papers_are_detected() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let pdf = input.path().join("2301.07041.pdf");

        assert_eq!(
            result_path_for(&pdf, output.path()),
            output.path().join("2301.07041.json")
        );
        assert!(!is_processed(&pdf, output.path()));
        fs::write(output.path().join("2301.07041.json"), "{}").unwrap();
        assert!(is_processed(&pdf, output.path()));
    }

    #[test]
    fn file_info_reports_size_and_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Paper.pdf");
        fs::write(&path, b"12345").unwrap();

        let info = file_info(&path).unwrap();
        assert_eq!(info.name, "Paper.pdf");
        assert_eq!(info.stem, "Paper");
        assert_eq!(info.size, 5);
        assert!(info.modified.is_some());

        assert!(matches!(
            file_info(&dir.path().join("missing.pdf")),
            Err(InputError::Metadata { .. })
        ));
    }
}
