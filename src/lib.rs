#![deny(missing_docs)]

//! Core library for paperdigest: turns PDF papers into JSON analyses and plain-text reports.

/// Completion providers, prompts, and the paper analyzer.
pub mod analysis;
/// Environment-driven configuration management.
pub mod config;
/// PDF text, metadata, and section extraction.
pub mod extraction;
/// Input directory discovery and result bookkeeping.
pub mod input;
/// Structured logging and tracing setup.
pub mod logging;
/// JSON results, human-readable reports, and result merging.
pub mod output;
/// Per-paper and batch orchestration.
pub mod pipeline;
/// Text cleanup, chunking, and prompt structuring.
pub mod preprocessing;
