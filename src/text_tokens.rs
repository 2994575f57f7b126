//! Token counting and token-boundary truncation for prompt budgeting.
//!
//! Uses the cl100k_base encoding. If the encoder cannot be loaded, counts fall
//! back to a chars/4 estimate and truncation to a char-boundary cut.

use once_cell::sync::Lazy;
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

static BPE: Lazy<Option<CoreBPE>> = Lazy::new(|| match cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(err) => {
        warn!(error = %err, "Failed to load cl100k_base tokenizer; using estimates");
        None
    }
});

const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

/// Count tokens in text.
pub fn count_tokens(text: &str) -> usize {
    match BPE.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.chars().count().div_ceil(CHARS_PER_TOKEN_ESTIMATE),
    }
}

/// Truncate text to at most `max_tokens` tokens.
///
/// Returns the input unchanged when it already fits.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    match BPE.as_ref() {
        Some(bpe) => {
            let tokens = bpe.encode_with_special_tokens(text);
            if tokens.len() <= max_tokens {
                return text.to_string();
            }
            bpe.decode(tokens[..max_tokens].to_vec())
                .unwrap_or_else(|_| truncate_chars(text, max_tokens * CHARS_PER_TOKEN_ESTIMATE))
        }
        None => truncate_chars(text, max_tokens * CHARS_PER_TOKEN_ESTIMATE),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
