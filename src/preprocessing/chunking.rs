//! Section-aware chunking.
//!
//! Papers that fit the budget stay whole. Longer papers are cut at section headings; the abstract
//! and conclusion lead the series when they fit, because a model reading only the first chunks
//! should still see them. Sections larger than the budget are sliced into fixed-size pieces.

use std::collections::HashMap;
use std::ops::Range;

use super::{Chunk, ChunkingError, PreprocessSettings};
use crate::extraction::{SectionKind, extract_sections};

const PRIORITY_SECTIONS: [SectionKind; 2] = [SectionKind::Abstract, SectionKind::Conclusion];

/// Cut `text` into pieces of at most `size` characters.
///
/// Consecutive pieces share `overlap` characters (clamped below `size`). With no overlap the
/// pieces cover the text exactly once: concatenating them yields `text`. Slicing happens on
/// `char` boundaries, so multi-byte text is never split inside a character.
pub fn split_fixed(text: &str, size: usize, overlap: usize) -> Result<Vec<&str>, ChunkingError> {
    Ok(fixed_spans(text, size, overlap)?
        .into_iter()
        .map(|span| &text[span])
        .collect())
}

fn fixed_spans(
    text: &str,
    size: usize,
    overlap: usize,
) -> Result<Vec<Range<usize>>, ChunkingError> {
    if size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    let step = size - overlap.min(size - 1);

    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut spans = Vec::with_capacity(char_count.div_ceil(step));
    let mut start = 0;
    while start < char_count {
        let end = (start + size).min(char_count);
        spans.push(boundaries[start]..boundaries[end]);
        if end == char_count {
            break;
        }
        start += step;
    }
    Ok(spans)
}

/// Split cleaned paper text into an ordered series of chunks.
///
/// - Text within the budget (estimated tokens <= `chunk_size_tokens`) becomes one `full` chunk.
/// - Otherwise the text is cut at section headings. Abstract and conclusion sections that fit the
///   character budget come first; the remaining sections follow in document order, whole when
///   they fit and sliced with [`split_fixed`] when they do not.
/// - `chunk_part` counts from 1 per section label; `total_chunks` is the series length.
///
/// Whitespace-only input produces no chunks.
pub fn split_into_chunks(
    text: &str,
    settings: &PreprocessSettings,
) -> Result<Vec<Chunk>, ChunkingError> {
    let limit = settings
        .chunk_size_tokens
        .saturating_mul(settings.chars_per_token);
    if limit == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let char_count = text.chars().count();
    if char_count / settings.chars_per_token <= settings.chunk_size_tokens {
        return Ok(vec![Chunk {
            text: text.to_string(),
            section: SectionKind::Full,
            chunk_part: 1,
            total_chunks: 1,
            offset: 0,
        }]);
    }

    let sections: Vec<_> = extract_sections(text)
        .into_iter()
        .filter(|section| !section.text.trim().is_empty())
        .collect();

    let fits = |body: &str| body.chars().count() <= limit;
    let mut placed = vec![false; sections.len()];
    let mut pieces: Vec<(SectionKind, usize, String)> = Vec::new();

    for kind in PRIORITY_SECTIONS {
        for (index, section) in sections.iter().enumerate() {
            if section.kind == kind && !placed[index] && fits(&section.text) {
                pieces.push((section.kind, section.offset, section.text.clone()));
                placed[index] = true;
            }
        }
    }

    for (index, section) in sections.iter().enumerate() {
        if placed[index] {
            continue;
        }
        if fits(&section.text) {
            pieces.push((section.kind, section.offset, section.text.clone()));
            continue;
        }
        for span in fixed_spans(&section.text, limit, settings.overlap_chars)? {
            let offset = section.offset + span.start;
            pieces.push((section.kind, offset, section.text[span].to_string()));
        }
    }

    let total_chunks = pieces.len();
    let mut parts: HashMap<SectionKind, usize> = HashMap::new();
    let chunks: Vec<Chunk> = pieces
        .into_iter()
        .map(|(section, offset, text)| {
            let part = parts.entry(section).or_insert(0);
            *part += 1;
            Chunk {
                text,
                section,
                chunk_part: *part,
                total_chunks,
                offset,
            }
        })
        .collect();

    tracing::debug!(total_chunks, limit, "Text split into chunks");
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(chunk_size_tokens: usize, overlap_chars: usize) -> PreprocessSettings {
        PreprocessSettings {
            chunk_size_tokens,
            chars_per_token: 1,
            overlap_chars,
        }
    }

    #[test]
    fn fixed_pieces_cover_text_exactly_once() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        for size in 1..=30 {
            let pieces = split_fixed(text, size, 0).unwrap();
            assert_eq!(pieces.concat(), text, "size {size}");
            assert!(pieces.iter().all(|piece| piece.chars().count() <= size));
            assert_eq!(pieces.len(), text.len().div_ceil(size));
        }
    }

    #[test]
    fn fixed_pieces_respect_char_boundaries() {
        let text = "ααβγδεζηθ";
        let pieces = split_fixed(text, 4, 0).unwrap();
        assert_eq!(pieces, vec!["ααβγ", "δεζη", "θ"]);
    }

    #[test]
    fn fixed_pieces_with_overlap_share_characters() {
        let pieces = split_fixed("abcdefghij", 4, 1).unwrap();
        assert_eq!(pieces, vec!["abcd", "defg", "ghij"]);
        let clamped = split_fixed("abc", 2, 5).unwrap();
        assert_eq!(clamped, vec!["ab", "bc"]);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            split_fixed("abc", 0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            split_into_chunks("abc", &settings(0, 0)),
            Err(ChunkingError::InvalidChunkSize)
        ));
    }

    #[test]
    fn short_text_is_a_single_full_chunk() {
        let chunks = split_into_chunks("short paper", &settings(100, 0)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section, SectionKind::Full);
        assert_eq!((chunks[0].chunk_part, chunks[0].total_chunks), (1, 1));
        assert!(split_into_chunks(" \n ", &settings(100, 0)).unwrap().is_empty());
    }

    fn long_paper() -> String {
        let filler = |word: &str, n: usize| vec![word; n].join(" ");
        format!(
            "Title line\nAbstract\n{}\n1 Introduction\n{}\n2 Method\n{}\n3 Conclusion\n{}",
            filler("abs", 5),
            filler("intro", 30),
            filler("meth", 6),
            filler("concl", 4),
        )
    }

    #[test]
    fn priority_sections_lead_the_series() {
        let text = long_paper();
        let chunks = split_into_chunks(&text, &settings(60, 0)).unwrap();
        assert_eq!(chunks[0].section, SectionKind::Abstract);
        assert_eq!(chunks[1].section, SectionKind::Conclusion);
        assert_eq!(chunks[2].section, SectionKind::Preamble);
        assert!(chunks.iter().any(|chunk| chunk.section == SectionKind::Methodology));
    }

    #[test]
    fn total_chunks_matches_series_and_parts_are_monotonic() {
        let text = long_paper();
        let chunks = split_into_chunks(&text, &settings(60, 0)).unwrap();
        assert!(chunks.iter().all(|chunk| chunk.total_chunks == chunks.len()));

        let intro_parts: Vec<usize> = chunks
            .iter()
            .filter(|chunk| chunk.section == SectionKind::Introduction)
            .map(|chunk| chunk.chunk_part)
            .collect();
        assert!(intro_parts.len() > 1);
        assert_eq!(intro_parts, (1..=intro_parts.len()).collect::<Vec<_>>());
        assert!(chunks.iter().all(|chunk| chunk.text.chars().count() <= 60));
    }

    #[test]
    fn chunks_reassemble_the_text_without_overlap() {
        let text = long_paper();
        let mut chunks = split_into_chunks(&text, &settings(60, 0)).unwrap();
        chunks.sort_by_key(|chunk| chunk.offset);
        let mut cursor = 0;
        for chunk in &chunks {
            assert_eq!(chunk.offset, cursor);
            assert_eq!(&text[chunk.offset..chunk.offset + chunk.text.len()], chunk.text);
            cursor += chunk.text.len();
        }
        assert_eq!(cursor, text.len());
    }
}
