//! Prompt templates for per-criterion pairwise judgements.
//!
//! Domain logic for rendering judging prompts. Provider-agnostic. Documents are
//! referred to by their display names only; the JSON reply keys `score_a` and
//! `score_b` are tied to those names by an explicit mapping line.

use crate::gateway::Message;
use crate::rank::types::Criterion;
use crate::text_tokens::{count_tokens, truncate_to_tokens};

// =============================================================================
// Budget
// =============================================================================

/// Total tokens available to prompt plus response.
pub const TOKEN_CEILING: u32 = 16_000;
/// Tokens always left for the response when sizing document text.
pub const RESPONSE_RESERVE: u32 = 1_000;
/// Upper bound on the response generation budget.
pub const MAX_RESPONSE_TOKENS: u32 = 1_500;
/// Re-tokenizing a truncated document can shift counts at the seams.
const TRUNCATION_SLACK_TOKENS: u32 = 32;

/// Generation budget for a prompt of `prompt_tokens` under `ceiling`.
pub fn generation_budget(prompt_tokens: u32, ceiling: u32) -> u32 {
    ceiling.saturating_sub(prompt_tokens).min(MAX_RESPONSE_TOKENS)
}

// =============================================================================
// Rendering
// =============================================================================

/// One side of the comparison as shown to the evaluator.
#[derive(Debug, Clone)]
pub struct PromptDocument {
    pub name: String,
    pub text: String,
}

impl PromptDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Rendered prompt ready for the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPrompt {
    pub template_slug: String,
    pub system: String,
    pub user: String,
}

impl EvaluationPrompt {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }

    pub fn token_count(&self) -> u32 {
        (count_tokens(&self.system) + count_tokens(&self.user)) as u32
    }
}

/// Escape XML special characters to prevent prompt injection via tag breaking.
fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A prompt template with placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// `body_a`/`body_b` must already be XML-escaped.
    fn render(
        &self,
        criterion_block: &str,
        name_a: &str,
        name_b: &str,
        body_a: &str,
        body_b: &str,
    ) -> EvaluationPrompt {
        let (name_a, name_b) = distinct_names(name_a, name_b);
        let safe_a = escape_xml_chars(&name_a);
        let safe_b = escape_xml_chars(&name_b);

        let fill = |s: &str| {
            s.replace("{criterion}", criterion_block)
                .replace("{name_a}", &safe_a)
                .replace("{name_b}", &safe_b)
        };

        let documents = format!(
            "<document name=\"{safe_a}\">\n{body_a}\n</document>\n\n<document name=\"{safe_b}\">\n{body_b}\n</document>"
        );

        EvaluationPrompt {
            template_slug: self.slug.to_string(),
            system: fill(self.system).trim().to_string(),
            user: format!(
                "{documents}\n\n{}\n\n{}",
                fill(self.user).trim(),
                fill(REPLY_FORMAT).trim()
            ),
        }
    }
}

/// Identical display names would make the reply ambiguous; suffix them.
fn distinct_names(a: &str, b: &str) -> (String, String) {
    if a == b {
        (format!("{a} (first)"), format!("{b} (second)"))
    } else {
        (a.to_string(), b.to_string())
    }
}

const REPLY_FORMAT: &str = r#"Respond with only a JSON object:
{"score_a": 1-5, "score_b": 1-5, "analysis_a": "...", "analysis_b": "...", "comparative_analysis": "...", "reasoning": "...", "winner": "A" | "B" | "Tie" | "N/A"}
In this object "a" and "A" mean {name_a}; "b" and "B" mean {name_b}. In all prose fields, refer to the documents by these names."#;

pub const RUBRIC_PROMPT: PromptTemplate = PromptTemplate {
    slug: "rubric_v1",
    system: r#"You are an expert document evaluator. You assess two documents against a single criterion, score each independently on a 1-5 rubric, then compare them directly and decide which one better satisfies the criterion."#,
    user: r#"Evaluate {name_a} and {name_b} on this criterion:
{criterion}

Score each document independently using the rubric, then compare them. Declare "Tie" only if they are genuinely equivalent on this criterion, and "N/A" only if the criterion cannot be applied to these documents."#,
};

pub const CUSTOM_PROMPT: PromptTemplate = PromptTemplate {
    slug: "custom_v1",
    system: r#"You are an expert document evaluator. You follow the evaluation instructions you are given, score each of two documents on a 1-5 scale, then decide which one better satisfies the instructions."#,
    user: r#"Evaluate {name_a} and {name_b} according to these instructions:
{criterion}

Score each document from 1 (poor) to 5 (excellent), then compare them."#,
};

fn rubric_block(criterion: &Criterion) -> String {
    let mut block = format!("<criterion name=\"{}\">\n", escape_xml_chars(&criterion.name));
    if !criterion.description.trim().is_empty() {
        block.push_str(&escape_xml_chars(criterion.description.trim()));
        block.push('\n');
    }
    for (level, text) in &criterion.scoring_levels {
        block.push_str(&format!("{level}: {}\n", escape_xml_chars(text.trim())));
    }
    block.push_str("</criterion>");
    block
}

fn custom_block(criterion: &Criterion) -> String {
    let instructions = criterion
        .custom_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(&criterion.description);
    format!(
        "<instructions name=\"{}\">\n{}\n</instructions>",
        escape_xml_chars(&criterion.name),
        escape_xml_chars(instructions.trim())
    )
}

/// Render the judging prompt for one criterion.
///
/// Uses the custom template when `custom` is set, else the rubric template.
pub fn render_criterion_prompt(
    criterion: &Criterion,
    custom: bool,
    a: &PromptDocument,
    b: &PromptDocument,
) -> EvaluationPrompt {
    render_escaped(
        criterion,
        custom,
        a,
        b,
        &escape_xml_chars(a.text.trim()),
        &escape_xml_chars(b.text.trim()),
    )
}

fn render_escaped(
    criterion: &Criterion,
    custom: bool,
    a: &PromptDocument,
    b: &PromptDocument,
    body_a: &str,
    body_b: &str,
) -> EvaluationPrompt {
    let (template, block) = if custom {
        (CUSTOM_PROMPT, custom_block(criterion))
    } else {
        (RUBRIC_PROMPT, rubric_block(criterion))
    };
    template.render(&block, &a.name, &b.name, body_a, body_b)
}

/// Cut escaped text to `max_tokens` without leaving half an entity behind.
fn clip_escaped(escaped: &str, max_tokens: usize) -> String {
    let mut cut = truncate_to_tokens(escaped, max_tokens);
    if let Some(amp) = cut.rfind('&') {
        if !cut[amp..].contains(';') {
            cut.truncate(amp);
        }
    }
    cut
}

/// Render a prompt whose documents fit under `ceiling` with room to reply.
///
/// Sizing is done on the escaped document text, half the remaining
/// allowance each, so at least `RESPONSE_RESERVE` tokens stay free. If the
/// rendered prompt still overshoots, the cut shrinks by the overshoot.
pub fn render_within_budget(
    criterion: &Criterion,
    custom: bool,
    a: &PromptDocument,
    b: &PromptDocument,
    ceiling: u32,
) -> EvaluationPrompt {
    let prompt = render_criterion_prompt(criterion, custom, a, b);
    let limit = ceiling.saturating_sub(RESPONSE_RESERVE);
    if prompt.token_count() <= limit {
        return prompt;
    }

    let body_a = escape_xml_chars(a.text.trim());
    let body_b = escape_xml_chars(b.text.trim());
    let overhead = render_escaped(criterion, custom, a, b, "", "").token_count();
    let mut per_doc = (limit.saturating_sub(overhead + TRUNCATION_SLACK_TOKENS) / 2) as usize;

    loop {
        let prompt = render_escaped(
            criterion,
            custom,
            a,
            b,
            &clip_escaped(&body_a, per_doc),
            &clip_escaped(&body_b, per_doc),
        );
        let tokens = prompt.token_count();
        if tokens <= limit || per_doc == 0 {
            return prompt;
        }
        let overshoot = (tokens - limit) as usize;
        per_doc = per_doc.saturating_sub(overshoot.div_ceil(2).max(1));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::normalize;

    fn criterion() -> Criterion {
        normalize(&[Criterion::new("clarity", "Clarity", 100.0)
            .with_description("How clear is the writing?")])
        .remove(0)
    }

    #[test]
    fn rubric_prompt_uses_display_names() {
        let a = PromptDocument::new("Alpha Report", "Alpha text");
        let b = PromptDocument::new("Beta Memo", "Beta text");
        let p = render_criterion_prompt(&criterion(), false, &a, &b);

        assert_eq!(p.template_slug, "rubric_v1");
        assert!(p.user.contains("Alpha Report"));
        assert!(p.user.contains("Beta Memo"));
        assert!(p.user.contains("How clear is the writing?"));
        assert!(p.user.contains("5: Excellent"));
        assert!(!p.user.contains("Document A"));
        assert!(!p.user.contains("Document B"));
        assert!(!p.user.contains("{name_a}"));
    }

    #[test]
    fn custom_prompt_embeds_instructions() {
        let c = criterion().with_custom_prompt("Prefer the one a CFO would approve.");
        let a = PromptDocument::new("One", "x");
        let b = PromptDocument::new("Two", "y");
        let p = render_criterion_prompt(&c, true, &a, &b);
        assert_eq!(p.template_slug, "custom_v1");
        assert!(p.user.contains("CFO would approve"));
    }

    #[test]
    fn identical_names_are_disambiguated() {
        let a = PromptDocument::new("draft.pdf", "x");
        let b = PromptDocument::new("draft.pdf", "y");
        let p = render_criterion_prompt(&criterion(), false, &a, &b);
        assert!(p.user.contains("draft.pdf (first)"));
        assert!(p.user.contains("draft.pdf (second)"));
    }

    #[test]
    fn xml_escaping() {
        let a = PromptDocument::new("A", "<script>alert('xss')</script>");
        let p = render_criterion_prompt(&criterion(), false, &a, &PromptDocument::new("B", "b"));
        assert!(p.user.contains("&lt;script&gt;"));
        assert!(!p.user.contains("<script>"));
    }

    #[test]
    fn generation_budget_bounds() {
        assert_eq!(generation_budget(1_000, TOKEN_CEILING), 1_500);
        assert_eq!(generation_budget(15_000, TOKEN_CEILING), 1_000);
        assert_eq!(generation_budget(15_900, TOKEN_CEILING), 100);
        assert_eq!(generation_budget(20_000, TOKEN_CEILING), 0);
    }

    #[test]
    fn oversized_documents_are_truncated() {
        let long = "lorem ipsum dolor sit amet ".repeat(4_000);
        let a = PromptDocument::new("Long A", long.clone());
        let b = PromptDocument::new("Long B", long);
        let p = render_within_budget(&criterion(), false, &a, &b, 4_000);
        assert!(p.token_count() <= 4_000 - RESPONSE_RESERVE);
        assert!(generation_budget(p.token_count(), 4_000) >= RESPONSE_RESERVE);
    }

    #[test]
    fn markup_heavy_documents_keep_response_reserve() {
        let markup = "<a>&</a> ".repeat(6_000);
        let a = PromptDocument::new("Page A", markup.clone());
        let b = PromptDocument::new("Page B", markup);
        let p = render_within_budget(&criterion(), false, &a, &b, TOKEN_CEILING);

        assert!(p.token_count() <= TOKEN_CEILING - RESPONSE_RESERVE);
        assert!(generation_budget(p.token_count(), TOKEN_CEILING) >= RESPONSE_RESERVE);
        assert!(p.user.contains("&lt;a&gt;&amp;&lt;/a&gt;"));
        assert!(!p.user.contains("<a>"));
    }

    #[test]
    fn clipping_drops_partial_entities() {
        assert_eq!(clip_escaped("x &amp", 100), "x ");
        assert_eq!(clip_escaped("x &amp; y", 100), "x &amp; y");
    }
}
