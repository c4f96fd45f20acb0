//! Deterministic analysis built from the paper's own sentences.
//!
//! Used when no completion provider is configured. The summary is drawn from the abstract (or
//! the opening of the paper when no abstract is found) and the results from the conclusion and
//! results sections, each bounded by a word budget.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::{Analysis, fields};
use crate::extraction::{PaperMetadata, SectionKind, extract_sections};

const SUMMARY_WORD_BUDGET: usize = 250;
const RESULTS_WORD_BUDGET: usize = 120;
const NOT_EXTRACTED: &str = "Not available (extractive analysis)";

static LEADING_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:\d{1,2}|[IVX]{1,4})\.?\s+)?[A-Za-z]+[ \t]*[:.\-]?\s*")
        .expect("valid heading prefix regex")
});

/// Build an analysis of `text` without a language model.
pub fn extractive_analysis(text: &str, metadata: &PaperMetadata, paper_name: &str) -> Analysis {
    let sections = extract_sections(text);
    let body_of = |kinds: &[SectionKind]| -> String {
        sections
            .iter()
            .filter(|section| kinds.contains(&section.kind))
            .map(|section| LEADING_HEADING.replace(&section.text, "").into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut summary_source = body_of(&[SectionKind::Abstract]);
    if summary_source.trim().is_empty() {
        summary_source = text.to_string();
    }
    let results_source = body_of(&[SectionKind::Conclusion, SectionKind::Results]);

    let summary = sentences_within_budget(&summary_source, SUMMARY_WORD_BUDGET);
    let results = sentences_within_budget(&results_source, RESULTS_WORD_BUDGET);

    let name = metadata
        .title
        .clone()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| paper_name.to_string());

    let mut analysis = Analysis::new();
    analysis.insert(fields::NAME.into(), Value::String(name));
    analysis.insert(
        fields::SUMMARY.into(),
        Value::String(if summary.is_empty() {
            NOT_EXTRACTED.into()
        } else {
            summary
        }),
    );
    analysis.insert(
        fields::RESULTS.into(),
        Value::String(if results.is_empty() {
            NOT_EXTRACTED.into()
        } else {
            results
        }),
    );
    analysis.insert(fields::SUCCESS.into(), Value::Null);
    analysis.insert(fields::PERFORMANCE.into(), Value::String(NOT_EXTRACTED.into()));
    if !metadata.authors.is_empty() {
        analysis.insert(
            "authors".into(),
            Value::Array(metadata.authors.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(arxiv_id) = &metadata.arxiv_id {
        analysis.insert("arxiv_id".into(), Value::String(arxiv_id.clone()));
    }
    analysis
}

/// Leading sentences of `text` whose combined word count stays within `max_words`.
///
/// A first sentence longer than the budget is cut at the budget instead of being dropped.
fn sentences_within_budget(text: &str, max_words: usize) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut used_words = 0usize;

    for sentence in sentences(text) {
        let words = sentence.split_whitespace().count();
        if used_words + words > max_words {
            if kept.is_empty() {
                kept.push(
                    sentence
                        .split_whitespace()
                        .take(max_words)
                        .collect::<Vec<_>>()
                        .join(" "),
                );
            }
            break;
        }
        used_words += words;
        kept.push(sentence.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    kept.join(" ")
}

/// Split on `.`, `!` or `?` followed by whitespace, keeping the terminator.
fn sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        let terminal = matches!(c, '.' | '!' | '?');
        let followed_by_space = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
        if terminal && followed_by_space {
            let end = index + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
