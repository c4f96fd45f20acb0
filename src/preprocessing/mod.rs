//! Text preprocessing: cleanup, section-aware chunking, and prompt structuring.

pub mod chunking;
mod format;

pub use chunking::split_fixed;
pub use format::structure_text;

use crate::extraction::{PaperMetadata, SectionKind};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

static PAGE_NUMBER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,4}$").expect("valid page number regex"));

const MAX_RUNNING_HEADER_CHARS: usize = 100;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A chunk budget of zero characters cannot make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Size parameters for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessSettings {
    /// Approximate token budget of a single chunk.
    pub chunk_size_tokens: usize,
    /// Characters assumed per token.
    pub chars_per_token: usize,
    /// Characters repeated between consecutive slices of an oversized section.
    pub overlap_chars: usize,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 6000,
            chars_per_token: 4,
            overlap_chars: 0,
        }
    }
}

/// Bounded slice of a paper with positional metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Chunk text.
    pub text: String,
    /// Section the text belongs to.
    pub section: SectionKind,
    /// 1-based index of this chunk among the chunks of the same section.
    pub chunk_part: usize,
    /// Number of chunks in the whole series.
    pub total_chunks: usize,
    /// Byte offset of the chunk in the text it was cut from.
    pub offset: usize,
}

/// Prepares extracted paper text for the analysis step.
#[derive(Debug, Clone, Default)]
pub struct TextPreprocessor {
    settings: PreprocessSettings,
}

impl TextPreprocessor {
    /// Create a preprocessor with the given size parameters.
    pub fn new(settings: PreprocessSettings) -> Self {
        Self { settings }
    }

    /// Size parameters in use.
    pub fn settings(&self) -> PreprocessSettings {
        self.settings
    }

    /// Character budget of a single chunk.
    pub fn chars_per_chunk(&self) -> usize {
        self.settings
            .chunk_size_tokens
            .saturating_mul(self.settings.chars_per_token)
    }

    /// Rough token estimate of `text` using the configured characters-per-token ratio.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count() / self.settings.chars_per_token.max(1)
    }

    /// Remove page furniture: stand-alone page numbers and short running headers carrying the
    /// arXiv stamp. Blank-line runs left behind collapse to one.
    pub fn clean(&self, text: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            let page_number = PAGE_NUMBER_LINE.is_match(trimmed);
            let running_header = trimmed.contains("arXiv")
                && trimmed.chars().count() <= MAX_RUNNING_HEADER_CHARS;
            if page_number || running_header {
                continue;
            }
            if trimmed.is_empty() && kept.last().is_none_or(|last| last.is_empty()) {
                continue;
            }
            kept.push(trimmed);
        }
        while kept.last().is_some_and(|line| line.is_empty()) {
            kept.pop();
        }
        kept.join("\n")
    }

    /// Split cleaned text into chunks. See [`chunking::split_into_chunks`].
    pub fn split_into_chunks(&self, text: &str) -> Result<Vec<Chunk>, ChunkingError> {
        chunking::split_into_chunks(text, &self.settings)
    }

    /// Clean and chunk in one step.
    pub fn prepare_chunks(&self, text: &str) -> Result<Vec<Chunk>, ChunkingError> {
        let cleaned = self.clean(text);
        let chunks = self.split_into_chunks(&cleaned)?;
        tracing::info!(
            chars = cleaned.chars().count(),
            estimated_tokens = self.estimate_tokens(&cleaned),
            chunks = chunks.len(),
            "Text prepared"
        );
        Ok(chunks)
    }

    /// Produce a single prompt block: the first chunk with its metadata header.
    ///
    /// Longer papers are represented by their leading chunk only; use
    /// [`TextPreprocessor::prepare_chunks`] to analyze every part.
    pub fn preprocess(&self, text: &str, metadata: &PaperMetadata) -> Result<String, ChunkingError> {
        let chunks = self.prepare_chunks(text)?;
        Ok(match chunks.first() {
            Some(first) => structure_text(&first.text, metadata, Some(first)),
            None => structure_text("", metadata, None),
        })
    }
}
