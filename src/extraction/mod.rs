//! PDF text and metadata extraction.
//!
//! Text comes from `pdf-extract`; the document information dictionary (`/Title`, `/Author`) is
//! read with `lopdf`. Everything derived from the text itself (title fallback, arXiv identifier,
//! section boundaries) lives in [`metadata`] and [`sections`].

pub mod metadata;
mod pdf;
pub mod sections;
mod text;

pub use metadata::{DocumentInfo, extract_metadata};
pub use pdf::{PdfExtractor, read_document_info};
pub use sections::{Section, SectionKind, extract_sections};
pub use text::clean_text;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while turning a PDF into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The input path does not exist.
    #[error("PDF not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File we attempted to read.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The bytes are not a PDF the parser understands (corrupt, encrypted, unsupported).
    #[error("failed to parse PDF {name}: {message}")]
    Parse {
        /// Human-readable name of the document.
        name: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The PDF parsed but carried no extractable text (typically a scanned document).
    #[error("no extractable text in {0}")]
    NoText(String),
}

/// Bibliographic metadata recovered for a paper. Unknown fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// Paper title, when one could be identified.
    pub title: Option<String>,
    /// Author names in document order.
    pub authors: Vec<String>,
    /// arXiv identifier such as `2301.07041v2`.
    pub arxiv_id: Option<String>,
}

impl PaperMetadata {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.authors.is_empty() && self.arxiv_id.is_none()
    }
}

/// Cleaned text and metadata of a single paper.
#[derive(Debug, Clone)]
pub struct ExtractedPaper {
    /// Full cleaned text.
    pub text: String,
    /// Metadata recovered from the document and its text.
    pub metadata: PaperMetadata,
}

/// Source of paper text used by the pipeline.
///
/// Extraction is synchronous and CPU bound; the pipeline runs it on the blocking pool.
pub trait PaperSource: Send + Sync {
    /// Extract cleaned text and metadata from the file at `path`.
    fn extract(&self, path: &Path) -> Result<ExtractedPaper, ExtractionError>;
}
