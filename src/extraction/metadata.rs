//! Title, author, and arXiv identifier recovery.

use regex::Regex;
use std::sync::LazyLock;

use super::PaperMetadata;
use super::sections::{SectionKind, extract_sections};

const MAX_TITLE_CHARS: usize = 300;
const TITLE_LINES: usize = 3;

static ARXIV_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\barxiv:\s*(?P<id>\d{4}\.\d{4,5}(?:v\d+)?|[a-z][a-z\-]*(?:\.[a-z]{2})?/\d{7}(?:v\d+)?)",
    )
    .expect("valid arXiv regex")
});

static ARXIV_STEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<id>\d{4}\.\d{4,5}(?:v\d+)?)$").expect("valid arXiv stem regex")
});

static TITLE_STOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bAbstract\b|\.").expect("valid title regex"));

static AUTHOR_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:,|;|&|\band\b)\s*").expect("valid author separator regex")
});

/// Values read from the PDF document information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// `/Title` entry.
    pub title: Option<String>,
    /// `/Author` entry.
    pub author: Option<String>,
}

/// Derive paper metadata from cleaned text, the document info dictionary, and the file stem.
///
/// Every field degrades independently: a paper without an arXiv stamp still gets its title.
pub fn extract_metadata(text: &str, info: &DocumentInfo, file_stem: Option<&str>) -> PaperMetadata {
    let title = info
        .title
        .as_deref()
        .and_then(usable_info_title)
        .or_else(|| title_from_text(text));

    let authors = info
        .author
        .as_deref()
        .map(split_authors)
        .unwrap_or_default();

    let arxiv_id = arxiv_id_from_text(before_references(text))
        .or_else(|| file_stem.and_then(arxiv_id_from_stem));

    PaperMetadata {
        title,
        authors,
        arxiv_id,
    }
}

/// First arXiv identifier stamped in the text, e.g. `arXiv:2301.07041v2`.
pub fn arxiv_id_from_text(text: &str) -> Option<String> {
    ARXIV_IN_TEXT
        .captures(text)
        .and_then(|captures| captures.name("id"))
        .map(|id| id.as_str().to_string())
}

/// Text ahead of the bibliography, where identifiers belong to the paper itself.
fn before_references(text: &str) -> &str {
    extract_sections(text)
        .iter()
        .find(|section| section.kind == SectionKind::References)
        .map_or(text, |section| &text[..section.offset])
}

/// arXiv identifier encoded in a download file name such as `2301.07041v2.pdf`.
pub fn arxiv_id_from_stem(stem: &str) -> Option<String> {
    ARXIV_STEM
        .captures(stem.trim())
        .and_then(|captures| captures.name("id"))
        .map(|id| id.as_str().to_string())
}

fn usable_info_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    let lower = trimmed.to_lowercase();
    let placeholder = lower.is_empty()
        || lower == "untitled"
        || [".pdf", ".dvi", ".tex", ".doc", ".docx"]
            .iter()
            .any(|ext| lower.ends_with(ext));
    if placeholder {
        None
    } else {
        Some(truncate_chars(trimmed, MAX_TITLE_CHARS))
    }
}

/// Heuristic title: the first lines of the paper, cut before `Abstract` or the first period.
///
/// Lines carrying the arXiv margin stamp are ignored since extractors often emit it first.
fn title_from_text(text: &str) -> Option<String> {
    let head = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !ARXIV_IN_TEXT.is_match(line))
        .take(TITLE_LINES)
        .collect::<Vec<_>>()
        .join(" ");

    let candidate = match TITLE_STOP.find(&head) {
        Some(stop) => &head[..stop.start()],
        None => head.as_str(),
    };
    let candidate = candidate.trim();
    if candidate.is_empty() {
        None
    } else {
        Some(truncate_chars(candidate, MAX_TITLE_CHARS))
    }
}

fn split_authors(raw: &str) -> Vec<String> {
    AUTHOR_SEPARATOR
        .split(raw.trim())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_new_and_old_style_identifiers() {
        assert_eq!(
            arxiv_id_from_text("stamp arXiv:2301.07041v2 [cs.CL] 3 Jan 2023").as_deref(),
            Some("2301.07041v2")
        );
        assert_eq!(
            arxiv_id_from_text("see arXiv: 1706.03762").as_deref(),
            Some("1706.03762")
        );
        assert_eq!(
            arxiv_id_from_text("arXiv:math.AG/0601001v1").as_deref(),
            Some("math.AG/0601001v1")
        );
        assert_eq!(arxiv_id_from_text("no identifier here"), None);
    }

    #[test]
    fn stem_fallback_requires_identifier_shape() {
        assert_eq!(arxiv_id_from_stem("2301.07041v2").as_deref(), Some("2301.07041v2"));
        assert_eq!(arxiv_id_from_stem("my-paper"), None);
    }

    #[test]
    fn cited_identifiers_do_not_become_the_paper_id() {
        let text = "Graph Sparsification\nAbstract\nWe prune edges.\nReferences\n[1] Vaswani et al. arXiv:1706.03762, 2017.";
        let metadata = extract_metadata(text, &DocumentInfo::default(), Some("2401.01234"));
        assert_eq!(metadata.arxiv_id.as_deref(), Some("2401.01234"));

        let metadata = extract_metadata(text, &DocumentInfo::default(), Some("graph-paper"));
        assert_eq!(metadata.arxiv_id, None);

        let stamped = format!("arXiv:2402.00001v1 [cs.LG]\n{text}");
        let metadata = extract_metadata(&stamped, &DocumentInfo::default(), None);
        assert_eq!(metadata.arxiv_id.as_deref(), Some("2402.00001v1"));
    }

    #[test]
    fn title_from_leading_lines() {
        let text = "arXiv:1706.03762v5 [cs.CL] 6 Dec 2017\nAttention Is All\nYou Need\nAbstract The dominant models.";
        let metadata = extract_metadata(text, &DocumentInfo::default(), None);
        assert_eq!(metadata.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(metadata.arxiv_id.as_deref(), Some("1706.03762v5"));
        assert!(metadata.authors.is_empty());
    }

    #[test]
    fn document_info_wins_when_meaningful() {
        let info = DocumentInfo {
            title: Some("  Deep Residual Learning  ".into()),
            author: Some("Kaiming He, Xiangyu Zhang and Jian Sun".into()),
        };
        let metadata = extract_metadata("Something else. Body", &info, Some("1512.03385"));
        assert_eq!(metadata.title.as_deref(), Some("Deep Residual Learning"));
        assert_eq!(
            metadata.authors,
            vec!["Kaiming He", "Xiangyu Zhang", "Jian Sun"]
        );
        assert_eq!(metadata.arxiv_id.as_deref(), Some("1512.03385"));
    }

    #[test]
    fn placeholder_info_title_falls_back_to_text() {
        let info = DocumentInfo {
            title: Some("main.dvi".into()),
            author: None,
        };
        let metadata = extract_metadata("Real Title. Body", &info, None);
        assert_eq!(metadata.title.as_deref(), Some("Real Title"));
    }

    #[test]
    fn empty_text_degrades_to_empty_metadata() {
        let metadata = extract_metadata("", &DocumentInfo::default(), None);
        assert!(metadata.is_empty());
    }
}
