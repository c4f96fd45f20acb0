//! Token counting and prompt truncation.
//!
//! Counting prefers `tiktoken-rs` encodings (by model name, then by encoding name, then
//! `cl100k_base`); when no encoding loads, a whitespace counter keeps the pipeline moving.

use anyhow::Error as TokenizerError;
use std::sync::Arc;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

/// Shared token counting function.
pub type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Delimiter framing the paper body inside prompts.
pub const PROMPT_DELIMITER: &str = "-----";
/// Marker appended to a truncated paper body.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Build a token counter for `model`, falling back to whitespace counting.
pub fn build_token_counter(model: &str) -> TokenCounter {
    match build_tiktoken_counter(model) {
        Ok(counter) => counter,
        Err(error) => {
            tracing::warn!(
                model,
                error = %error,
                "Tokenizer unavailable; falling back to whitespace counter"
            );
            whitespace_token_counter()
        }
    }
}

fn build_tiktoken_counter(model: &str) -> Result<TokenCounter, TokenizerError> {
    let normalized = model.trim();
    let target = if normalized.is_empty() {
        "cl100k_base"
    } else {
        normalized
    };
    let encoding = Arc::new(resolve_encoding(target)?);
    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            encoding_from_name(model).unwrap_or_else(|| {
                tracing::debug!(model, "Using 'cl100k_base' encoding for token counting");
                cl100k_base()
            })
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, TokenizerError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

/// Counter that treats every whitespace-separated word as one token.
pub fn whitespace_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

/// Keep `prompt` within `budget` tokens.
///
/// When the prompt frames the paper body between two [`PROMPT_DELIMITER`]s, only the body is
/// shortened and [`TRUNCATION_MARKER`] is appended to it, so instructions before and after the
/// body survive. Otherwise the prompt itself is cut.
pub fn truncate_prompt(prompt: &str, budget: usize, counter: &TokenCounter) -> String {
    let tokens = counter.as_ref()(prompt);
    if tokens <= budget {
        return prompt.to_string();
    }
    tracing::warn!(tokens, budget, "Prompt exceeds token budget; truncating");

    let (Some(first), Some(last)) = (prompt.find(PROMPT_DELIMITER), prompt.rfind(PROMPT_DELIMITER))
    else {
        return prefix_within_budget(prompt, budget, counter).to_string();
    };
    if first == last {
        return prefix_within_budget(prompt, budget, counter).to_string();
    }

    let intro = &prompt[..first];
    let body = &prompt[first + PROMPT_DELIMITER.len()..last];
    let outro = &prompt[last + PROMPT_DELIMITER.len()..];

    let frame = counter.as_ref()(intro)
        + counter.as_ref()(outro)
        + counter.as_ref()(TRUNCATION_MARKER)
        + 2 * counter.as_ref()(PROMPT_DELIMITER);
    let body_budget = budget.saturating_sub(frame);
    let kept = prefix_within_budget(body, body_budget, counter).trim_end();

    let truncated = format!(
        "{intro}{PROMPT_DELIMITER}{kept}\n{TRUNCATION_MARKER}\n{PROMPT_DELIMITER}{outro}"
    );
    tracing::debug!(
        tokens = counter.as_ref()(&truncated),
        "Prompt truncated"
    );
    truncated
}

/// Longest prefix of `text` (on a `char` boundary) whose token count fits `budget`.
fn prefix_within_budget<'a>(text: &'a str, budget: usize, counter: &TokenCounter) -> &'a str {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .collect();

    let (mut low, mut high) = (0usize, boundaries.len() - 1);
    while low < high {
        let mid = (low + high).div_ceil(2);
        if counter.as_ref()(&text[..boundaries[mid]]) <= budget {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    &text[..boundaries[low]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_counter_counts_words() {
        let counter = whitespace_token_counter();
        assert_eq!(counter.as_ref()("one two  three"), 3);
        assert_eq!(counter.as_ref()(" "), 1);
        assert_eq!(counter.as_ref()(""), 0);
    }

    #[test]
    fn tiktoken_counter_loads_for_known_models() {
        let counter = build_token_counter("gpt-4");
        let tokens = counter.as_ref()("The quick brown fox jumps over the lazy dog.");
        assert!(tokens > 5 && tokens < 20);
    }

    #[test]
    fn short_prompts_are_untouched() {
        let counter = whitespace_token_counter();
        assert_eq!(truncate_prompt("a b c", 3, &counter), "a b c");
    }

    #[test]
    fn truncation_keeps_instructions_around_the_body() {
        let counter = whitespace_token_counter();
        let body = vec!["word"; 100].join(" ");
        let prompt = format!("intro words\n{PROMPT_DELIMITER}\n{body}\n{PROMPT_DELIMITER}\noutro words");

        let truncated = truncate_prompt(&prompt, 20, &counter);
        assert!(counter.as_ref()(&truncated) <= 20);
        assert!(truncated.starts_with("intro words\n-----"));
        assert!(truncated.ends_with("-----\noutro words"));
        assert!(truncated.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn undelimited_prompts_are_cut_directly() {
        let counter = whitespace_token_counter();
        let prompt = vec!["word"; 50].join(" ");
        let truncated = truncate_prompt(&prompt, 10, &counter);
        assert_eq!(counter.as_ref()(&truncated), 10);
        assert!(prompt.starts_with(&truncated));
    }
}
