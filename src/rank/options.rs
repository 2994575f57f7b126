//! Settings for a ranking run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::evaluator::DEFAULT_MODEL;
use crate::prompts::TOKEN_CEILING;

/// Minimum trimmed character count for a document to be judged on a criterion.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 50;

/// Default per-call evaluator timeout, in seconds.
pub const DEFAULT_EVALUATOR_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RankConfig {
    /// Model id passed to the evaluator.
    pub model: String,
    /// Upper bound on a single evaluator call; expiry fails the pair.
    pub evaluator_timeout_secs: u64,
    /// Documents shorter than this (trimmed chars) skip the criterion.
    pub min_content_chars: usize,
    /// Judge every criterion with the free-form instructions template.
    pub custom_prompt_mode: bool,
    /// Sort the two halves of each merge level concurrently.
    pub parallel_merge: bool,
    /// Prompt + response token ceiling.
    pub token_ceiling: u32,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            evaluator_timeout_secs: DEFAULT_EVALUATOR_TIMEOUT_SECS,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            custom_prompt_mode: false,
            parallel_merge: false,
            token_ceiling: TOKEN_CEILING,
        }
    }
}

impl RankConfig {
    /// Defaults overridden by `RANKCENTRAL_*` environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model) = lookup("RANKCENTRAL_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(secs) = lookup("RANKCENTRAL_TIMEOUT_SECONDS").and_then(|s| s.parse().ok()) {
            self.evaluator_timeout_secs = secs;
        }
        if let Some(chars) = lookup("RANKCENTRAL_MIN_CONTENT_CHARS").and_then(|s| s.parse().ok())
        {
            self.min_content_chars = chars;
        }
        if let Some(flag) = lookup("RANKCENTRAL_CUSTOM_PROMPT").and_then(|s| parse_flag(&s)) {
            self.custom_prompt_mode = flag;
        }
        if let Some(flag) = lookup("RANKCENTRAL_PARALLEL_MERGE").and_then(|s| parse_flag(&s)) {
            self.parallel_merge = flag;
        }
        self
    }

    pub fn evaluator_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluator_timeout_secs)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
