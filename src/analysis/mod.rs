//! Analysis step: turn prepared paper text into an [`Analysis`] mapping.
//!
//! A completion provider (OpenAI chat completions or a local Ollama runtime) reads the paper and
//! answers with JSON. Long papers are analyzed chunk by chunk and consolidated. When no provider
//! is configured the analyzer falls back to a deterministic extractive analysis built from the
//! abstract and conclusion.

mod analyzer;
mod client;
pub mod extractive;
mod ollama;
mod openai;
pub mod prompts;
pub mod response;
pub mod tokens;

pub use analyzer::{AnalysisError, AnalysisSettings, PaperAnalyzer, PreparedPaper};
pub use client::{CompletionClient, CompletionError, CompletionRequest, build_completion_client};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Analysis result: arbitrary keys mapped to (possibly nested) JSON values.
pub type Analysis = serde_json::Map<String, serde_json::Value>;

/// Conventional keys of an analysis produced by this crate.
pub mod fields {
    /// Paper title or file name.
    pub const NAME: &str = "name";
    /// Concise summary of the paper.
    pub const SUMMARY: &str = "summary";
    /// Main results and contributions.
    pub const RESULTS: &str = "results";
    /// Whether the paper met its stated goals (`true`, `false`, or `null`).
    pub const SUCCESS: &str = "success";
    /// Reported performance metrics.
    pub const PERFORMANCE: &str = "performance";
    /// Failure description attached to partial results.
    pub const ERROR: &str = "error";
}
