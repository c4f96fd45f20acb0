//! Persisting analyses: JSON results with a metadata envelope, human-readable reports, and
//! merging of partial analyses.

mod report;

pub use report::format_json_for_human;

use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::analysis::Analysis;

/// Key of the envelope added to saved analyses.
pub const METADATA_KEY: &str = "__metadata__";

/// Errors raised while writing or reading results.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Filesystem failure at `path`.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Serialization or deserialization failure.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A saved file did not hold a JSON object.
    #[error("{} does not contain a JSON object", .0.display())]
    NotAnObject(PathBuf),
    /// The current time could not be rendered.
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// File stem used for the results of `paper_name`: the file name without directories and
/// without a trailing `.pdf` (any case).
///
/// Only the `.pdf` suffix is removed, so a bare arXiv identifier such as `2301.07041` keeps its
/// full name.
pub fn result_stem(paper_name: &str) -> String {
    let file_name = Path::new(paper_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(paper_name);
    let lower = file_name.to_ascii_lowercase();
    match lower.strip_suffix(".pdf") {
        Some(stem) if !stem.is_empty() => file_name[..stem.len()].to_string(),
        _ => file_name.to_string(),
    }
}

/// Write `analysis` to `<output_dir>/<stem>.json` with a `__metadata__` envelope carrying the
/// save time (RFC 3339, UTC) and `paper_name`. The directory is created when missing.
pub fn save_paper_analysis(
    analysis: &Analysis,
    paper_name: &str,
    output_dir: &Path,
) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(output_dir).map_err(|source| OutputError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let path = output_dir.join(format!("{}.json", result_stem(paper_name)));

    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut document = analysis.clone();
    document.insert(
        METADATA_KEY.into(),
        json!({ "timestamp": timestamp, "source": paper_name }),
    );

    let serialized =
        serde_json::to_string_pretty(&document).map_err(|source| OutputError::Json {
            path: path.clone(),
            source,
        })?;
    fs::write(&path, serialized).map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Analysis saved");
    Ok(path)
}

/// Read a saved analysis back, envelope included.
pub fn load_paper_analysis(path: &Path) -> Result<Analysis, OutputError> {
    let contents = fs::read_to_string(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(analysis) => Ok(analysis),
        _ => Err(OutputError::NotAnObject(path.to_path_buf())),
    }
}

/// Write the [`format_json_for_human`] rendering of `analysis` to `<output_dir>/<stem>.txt`.
pub fn save_human_report(
    analysis: &Analysis,
    paper_name: &str,
    output_dir: &Path,
) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(output_dir).map_err(|source| OutputError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let path = output_dir.join(format!("{}.txt", result_stem(paper_name)));
    fs::write(&path, format_json_for_human(analysis)).map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Report saved");
    Ok(path)
}

/// Combine partial analyses in order.
///
/// For each key, a later value replaces an earlier one, except when both are strings: those are
/// joined with a blank line. An empty slice yields an empty mapping and a single analysis is
/// returned unchanged.
pub fn merge_results(results: &[Analysis]) -> Analysis {
    let mut combined = Analysis::new();
    for result in results {
        for (key, value) in result {
            match (combined.get_mut(key), value) {
                (Some(Value::String(existing)), Value::String(addition)) => {
                    existing.push_str("\n\n");
                    existing.push_str(addition);
                }
                _ => {
                    combined.insert(key.clone(), value.clone());
                }
            }
        }
    }
    combined
}
