use std::fmt::Write as _;

use super::Chunk;
use crate::extraction::PaperMetadata;

/// Prefix `text` with a header describing the paper and, for multi-part series, the chunk.
///
/// The header is separated from the body by a blank line and omitted when there is nothing to
/// say.
pub fn structure_text(text: &str, metadata: &PaperMetadata, chunk: Option<&Chunk>) -> String {
    let mut header = String::new();
    if let Some(title) = metadata.title.as_deref().filter(|title| !title.is_empty()) {
        let _ = writeln!(header, "Title: {title}");
    }
    if !metadata.authors.is_empty() {
        let _ = writeln!(header, "Authors: {}", metadata.authors.join(", "));
    }
    if let Some(arxiv_id) = metadata.arxiv_id.as_deref().filter(|id| !id.is_empty()) {
        let _ = writeln!(header, "arXiv ID: {arxiv_id}");
    }
    if let Some(chunk) = chunk.filter(|chunk| chunk.total_chunks > 1) {
        let _ = writeln!(header, "Section: {}", chunk.section);
        let _ = writeln!(header, "Part: {}", chunk.chunk_part);
        let _ = writeln!(header, "Total parts: {}", chunk.total_chunks);
    }

    if header.is_empty() {
        text.to_string()
    } else {
        format!("{header}\n{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::SectionKind;

    #[test]
    fn multi_part_chunk_carries_position() {
        let metadata = PaperMetadata {
            title: Some("Graphs".into()),
            authors: vec![],
            arxiv_id: Some("2401.00001".into()),
        };
        let chunk = Chunk {
            text: "body".into(),
            section: SectionKind::Results,
            chunk_part: 2,
            total_chunks: 5,
            offset: 10,
        };
        assert_eq!(
            structure_text("body", &metadata, Some(&chunk)),
            "Title: Graphs\narXiv ID: 2401.00001\nSection: results\nPart: 2\nTotal parts: 5\n\nbody"
        );
    }

    #[test]
    fn nothing_known_leaves_text_untouched() {
        assert_eq!(structure_text("body", &PaperMetadata::default(), None), "body");
    }
}
