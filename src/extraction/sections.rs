//! Heading-based segmentation of paper text.
//!
//! A heading is recognised at the start of a line: an optional section number (`2`, `2.`,
//! `IV.`) followed by one of the usual section names. A numbered heading must start with a
//! capital letter, so a wrapped line such as "10 experiments were run" is body text. To avoid
//! splitting on sentences such as "Results show that...", an unnumbered heading must either stand
//! alone on its line, be followed by punctuation, be written in capitals, or be `Abstract` (often
//! run into its first sentence).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?P<number>(?:\d{1,2}|[IVX]{1,4})\.?[ \t]+)?(?P<name>(?i:abstract|introduction|methodology|methods?|approach|results|evaluation|experiments?|conclusions?|discussion|references|bibliography))\b(?P<rest>[^\n]*)",
    )
    .expect("valid heading regex")
});

/// Canonical section labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// Text ahead of the first recognised heading (title block, authors, affiliations).
    Preamble,
    /// Abstract.
    Abstract,
    /// Introduction.
    Introduction,
    /// Methods, methodology, or approach.
    Methodology,
    /// Results, evaluation, or experiments.
    Results,
    /// Conclusion or discussion.
    Conclusion,
    /// References or bibliography.
    References,
    /// Whole document kept as one piece.
    Full,
}

impl SectionKind {
    /// Lowercase label used in chunk metadata and prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preamble => "preamble",
            Self::Abstract => "abstract",
            Self::Introduction => "introduction",
            Self::Methodology => "methodology",
            Self::Results => "results",
            Self::Conclusion => "conclusion",
            Self::References => "references",
            Self::Full => "full",
        }
    }

    fn from_heading(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "abstract" => Self::Abstract,
            "introduction" => Self::Introduction,
            "methodology" | "method" | "methods" | "approach" => Self::Methodology,
            "results" | "evaluation" | "experiment" | "experiments" => Self::Results,
            "conclusion" | "conclusions" | "discussion" => Self::Conclusion,
            _ => Self::References,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contiguous region of the paper text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Label of the region.
    pub kind: SectionKind,
    /// Byte offset of the region in the source text.
    pub offset: usize,
    /// Region text, heading included.
    pub text: String,
}

/// Split `text` at recognised headings, in document order.
///
/// The returned sections partition the input: concatenating their `text` yields `text`.
/// Consecutive headings of the same kind (e.g. "Experiments" then "Results") stay in one section.
pub fn extract_sections(text: &str) -> Vec<Section> {
    let mut boundaries: Vec<(usize, SectionKind)> = Vec::new();
    for captures in HEADING.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.name("name")) else {
            continue;
        };
        let numbered = captures.name("number").is_some();
        let rest = captures.name("rest").map_or("", |m| m.as_str());
        if !looks_like_heading(name.as_str(), rest, numbered) {
            continue;
        }
        let kind = SectionKind::from_heading(name.as_str());
        if boundaries.last().is_some_and(|(_, last)| *last == kind) {
            continue;
        }
        boundaries.push((whole.start(), kind));
    }

    let mut sections = Vec::with_capacity(boundaries.len() + 1);
    let first_start = boundaries.first().map_or(text.len(), |(start, _)| *start);
    if first_start > 0 {
        sections.push(Section {
            kind: SectionKind::Preamble,
            offset: 0,
            text: text[..first_start].to_string(),
        });
    }

    for (index, (start, kind)) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(index + 1)
            .map_or(text.len(), |(next, _)| *next);
        sections.push(Section {
            kind: *kind,
            offset: *start,
            text: text[*start..end].to_string(),
        });
    }

    sections
}

fn looks_like_heading(name: &str, rest: &str, numbered: bool) -> bool {
    if numbered {
        return name.starts_with(char::is_uppercase);
    }
    if name.eq_ignore_ascii_case("abstract") {
        return true;
    }
    let rest = rest.trim_start();
    if rest.is_empty() || rest.starts_with([':', '.', '-', '\u{2014}', '\u{2013}']) {
        return true;
    }
    name.len() > 1 && name.chars().all(|c| c.is_uppercase())
}
