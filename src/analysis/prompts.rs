//! Prompt templates for paper analysis.
//!
//! Paper content is always framed by [`PROMPT_DELIMITER`] lines so that
//! [`truncate_prompt`](super::tokens::truncate_prompt) can shorten the body while keeping the
//! instructions intact.

use serde_json::Value;

use super::tokens::PROMPT_DELIMITER;
use super::{Analysis, fields};

/// System instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "You are an assistant specialized in analyzing academic papers.";

const ANSWER_FORMAT: &str = r#"Answer ONLY with a JSON object using exactly these keys:
{
  "name": "Full title of the paper",
  "summary": "Concise summary of the paper (at most 250 words)",
  "results": "Main results and contributions",
  "success": true or false (whether the paper met its stated goals),
  "performance": "Reported performance metrics, compared with prior work when possible"
}"#;

/// Position of a chunk inside a multi-chunk series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPosition {
    /// Opening chunk.
    First,
    /// Any chunk between the first and the last.
    Middle,
    /// Closing chunk.
    Last,
}

impl ChunkPosition {
    /// Position of chunk `index` (0-based) in a series of `total` chunks.
    pub fn of(index: usize, total: usize) -> Self {
        if index == 0 {
            Self::First
        } else if index + 1 >= total {
            Self::Last
        } else {
            Self::Middle
        }
    }
}

/// Prompt asking for a complete analysis of a whole paper.
pub fn paper_analysis_prompt(paper_text: &str) -> String {
    format!(
        "Analyze the following academic paper and extract the requested information.\n\
         {PROMPT_DELIMITER}\n{paper_text}\n{PROMPT_DELIMITER}\n\
         {ANSWER_FORMAT}\n\
         If a piece of information is not in the paper, say so in the corresponding field."
    )
}

/// Prompt for one chunk of a longer paper. `chunk_info` describes the chunk's place in the
/// series (for example `Part 2/5 - Section: results (part 1)`).
pub fn chunk_prompt(position: ChunkPosition, chunk_text: &str, chunk_info: &str) -> String {
    let (intro, outro) = match position {
        ChunkPosition::First => (
            "This is the FIRST part of an academic paper you will receive in several parts.\n\
             Start analyzing it; identify the title, the problem addressed and the approach.",
            "Fill in every field you can from this part alone. Later parts will complete the picture.",
        ),
        ChunkPosition::Middle => (
            "This is an INTERMEDIATE part of an academic paper you are analyzing.\n\
             Focus on methods, experiments and intermediate findings.",
            "Fill in the fields this part informs; leave the others brief.",
        ),
        ChunkPosition::Last => (
            "This is the LAST part of an academic paper you are analyzing.\n\
             Focus on results, conclusions and reported performance.",
            "Summarize the final results and judge whether the paper met its goals.",
        ),
    };
    format!(
        "{intro}\n[{chunk_info}]\n\
         {PROMPT_DELIMITER}\n{chunk_text}\n{PROMPT_DELIMITER}\n\
         {outro}\n{ANSWER_FORMAT}"
    )
}

/// Prompt asking the model to merge per-chunk analyses of `paper_name` into one.
pub fn consolidation_prompt(partials: &[Analysis], paper_name: &str) -> String {
    let mut parts = String::new();
    for (index, partial) in partials.iter().enumerate() {
        parts.push_str(&format!(
            "Part {}:\n- Summary: {}\n- Results: {}\n- Performance: {}\n\n",
            index + 1,
            text_field(partial, fields::SUMMARY),
            text_field(partial, fields::RESULTS),
            text_field(partial, fields::PERFORMANCE),
        ));
    }
    format!(
        "The paper \"{paper_name}\" was analyzed in {count} parts. Consolidate the partial \
         analyses below into a single coherent analysis of the whole paper.\n\
         {PROMPT_DELIMITER}\n{body}{PROMPT_DELIMITER}\n\
         {ANSWER_FORMAT}",
        count = partials.len(),
        body = parts,
    )
}

fn text_field<'a>(analysis: &'a Analysis, key: &str) -> std::borrow::Cow<'a, str> {
    match analysis.get(key) {
        Some(Value::String(text)) => std::borrow::Cow::Borrowed(text.as_str()),
        Some(Value::Null) | None => std::borrow::Cow::Borrowed("Not available"),
        Some(other) => std::borrow::Cow::Owned(other.to_string()),
    }
}
