//! Turning provider answers into [`Analysis`] mappings.

use serde_json::Value;

use super::{Analysis, fields};

const FORMAT_ERROR: &str = "Not available (format error)";

/// Parse a provider answer into an analysis, filling `name` with `paper_name` when the answer
/// leaves it out or empty.
///
/// Answers wrapped in Markdown code fences are unwrapped first. Anything that does not parse as a
/// JSON object becomes a [`fallback_analysis`] carrying the raw answer as its summary.
pub fn parse_analysis(content: &str, paper_name: &str) -> Analysis {
    let candidate = strip_code_fence(content);
    let parsed = serde_json::from_str::<Value>(candidate)
        .ok()
        .or_else(|| outermost_object(candidate).and_then(|slice| serde_json::from_str(slice).ok()));

    match parsed {
        Some(Value::Object(mut analysis)) => {
            let has_name = analysis
                .get(fields::NAME)
                .is_some_and(|name| !name.is_null() && name.as_str() != Some(""));
            if !has_name {
                analysis.insert(fields::NAME.into(), Value::String(paper_name.to_string()));
            }
            analysis
        }
        _ => {
            tracing::warn!(paper = paper_name, "Answer is not a JSON object; keeping raw text");
            fallback_analysis(content, paper_name)
        }
    }
}

/// Analysis used when the answer could not be parsed: the raw text becomes the summary.
pub fn fallback_analysis(content: &str, paper_name: &str) -> Analysis {
    let mut analysis = Analysis::new();
    analysis.insert(fields::NAME.into(), Value::String(paper_name.to_string()));
    analysis.insert(fields::SUMMARY.into(), Value::String(content.trim().to_string()));
    analysis.insert(fields::RESULTS.into(), Value::String(FORMAT_ERROR.into()));
    analysis.insert(fields::SUCCESS.into(), Value::Null);
    analysis.insert(fields::PERFORMANCE.into(), Value::String(FORMAT_ERROR.into()));
    analysis
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let (start, marker) = if let Some(index) = trimmed.find("```json") {
        (index, "```json")
    } else if let Some(index) = trimmed.find("```") {
        (index, "```")
    } else {
        return trimmed;
    };
    let rest = &trimmed[start + marker.len()..];
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
