//! The evaluator capability: one rendered prompt in, one per-criterion verdict out.
//!
//! `Evaluator` is the seam the comparator depends on; tests substitute
//! deterministic stubs. `GatewayEvaluator` is the LLM-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::gateway::{Attribution, ChatGateway, ChatRequest, ProviderError};
use crate::prompts::EvaluationPrompt;
use crate::rank::types::{CriterionEvaluation, CriterionWinner};

/// Default model for judgements.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("evaluator configuration error: {0}")]
    Config(String),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("evaluator timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Check credentials/configuration before any pair is judged.
    fn validate(&self) -> Result<(), EvaluatorError> {
        Ok(())
    }

    /// Judge one pair on one criterion.
    ///
    /// Returned scores are in 1..=5. `criterion_id`/`criterion_name` may be
    /// left empty; the comparator backfills them. `run_id` names the ranking
    /// run the call belongs to.
    async fn evaluate(
        &self,
        prompt: &EvaluationPrompt,
        max_tokens: u32,
        run_id: Uuid,
    ) -> Result<CriterionEvaluation, EvaluatorError>;
}

// =============================================================================
// JSON parsing
// =============================================================================

/// Raw JSON structure from the model reply.
#[derive(Debug, Deserialize)]
struct EvaluationJson {
    #[serde(default, alias = "criterionId")]
    criterion_id: Option<String>,
    #[serde(default, alias = "criterionName")]
    criterion_name: Option<String>,
    #[serde(alias = "scoreA")]
    score_a: Option<f64>,
    #[serde(alias = "scoreB")]
    score_b: Option<f64>,
    #[serde(default, alias = "analysisA")]
    analysis_a: Option<String>,
    #[serde(default, alias = "analysisB")]
    analysis_b: Option<String>,
    #[serde(default, alias = "comparativeAnalysis")]
    comparative_analysis: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    winner: Option<String>,
}

fn parse_score(raw: Option<f64>, field: &str) -> Result<u8, EvaluatorError> {
    let score = raw.ok_or_else(|| EvaluatorError::Parse(format!("missing '{field}'")))?;
    if score.fract() != 0.0 || !(1.0..=5.0).contains(&score) {
        return Err(EvaluatorError::Parse(format!(
            "{field} out of allowed range [1,5]: {score}"
        )));
    }
    Ok(score as u8)
}

fn parse_winner(raw: Option<&str>) -> Result<CriterionWinner, EvaluatorError> {
    let Some(raw) = raw else {
        return Ok(CriterionWinner::NotApplicable);
    };
    match raw.trim().to_ascii_uppercase().as_str() {
        "A" => Ok(CriterionWinner::A),
        "B" => Ok(CriterionWinner::B),
        "TIE" => Ok(CriterionWinner::Tie),
        "N/A" | "NA" | "" => Ok(CriterionWinner::NotApplicable),
        other => Err(EvaluatorError::Parse(format!("invalid winner: {other}"))),
    }
}

/// Parse a model reply into a CriterionEvaluation.
pub fn parse_evaluation_response(raw: &str) -> Result<CriterionEvaluation, EvaluatorError> {
    let json_str = extract_json(raw);
    let parsed: EvaluationJson =
        serde_json::from_str(json_str).map_err(|e| EvaluatorError::Parse(e.to_string()))?;

    Ok(CriterionEvaluation {
        criterion_id: parsed.criterion_id.unwrap_or_default(),
        criterion_name: parsed.criterion_name.unwrap_or_default(),
        score_a: parse_score(parsed.score_a, "score_a")?,
        score_b: parse_score(parsed.score_b, "score_b")?,
        analysis_a: parsed.analysis_a.unwrap_or_default(),
        analysis_b: parsed.analysis_b.unwrap_or_default(),
        comparative_analysis: parsed.comparative_analysis.unwrap_or_default(),
        reasoning: parsed.reasoning.unwrap_or_default(),
        winner: parse_winner(parsed.winner.as_deref())?,
    })
}

/// Extract the first balanced JSON object (models sometimes add prose or fences).
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find('{') else {
        return trimmed;
    };
    let remainder = &trimmed[start..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in remainder.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &remainder[..=i];
                }
            }
            _ => {}
        }
    }
    trimmed
}

// =============================================================================
// Gateway-backed evaluator
// =============================================================================

/// Evaluator that asks a chat model for a JSON verdict.
pub struct GatewayEvaluator<G: ChatGateway> {
    gateway: G,
    model: String,
    attribution: Attribution,
}

impl<G: ChatGateway> GatewayEvaluator<G> {
    pub fn new(gateway: G, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            attribution: Attribution::new("rank::evaluate"),
        }
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl<G: ChatGateway> Evaluator for GatewayEvaluator<G> {
    fn validate(&self) -> Result<(), EvaluatorError> {
        if self.model.trim().is_empty() {
            return Err(EvaluatorError::Config("model is empty".into()));
        }
        self.gateway
            .check_credentials()
            .map_err(|e| EvaluatorError::Config(e.to_string()))
    }

    async fn evaluate(
        &self,
        prompt: &EvaluationPrompt,
        max_tokens: u32,
        run_id: Uuid,
    ) -> Result<CriterionEvaluation, EvaluatorError> {
        let request = ChatRequest::new(
            self.model.clone(),
            prompt.to_messages(),
            self.attribution.clone().with_run(run_id),
        )
        .max_tokens(max_tokens)
        .json();

        let response = self.gateway.chat(request).await?;
        parse_evaluation_response(&response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_reply() {
        let raw = r#"{"score_a": 5, "score_b": 2, "analysis_a": "strong", "analysis_b": "weak",
            "comparative_analysis": "first is better", "reasoning": "depth", "winner": "A"}"#;
        let eval = parse_evaluation_response(raw).unwrap();
        assert_eq!(eval.score_a, 5);
        assert_eq!(eval.score_b, 2);
        assert_eq!(eval.winner, CriterionWinner::A);
        assert!(eval.criterion_id.is_empty());
    }

    #[test]
    fn parses_camel_case_and_surrounding_text() {
        let raw = "Here is my verdict:\n```json\n{\"scoreA\": 3, \"scoreB\": 3, \"winner\": \"tie\", \"reasoning\": \"a {brace} inside\"}\n```";
        let eval = parse_evaluation_response(raw).unwrap();
        assert_eq!(eval.winner, CriterionWinner::Tie);
        assert_eq!(eval.reasoning, "a {brace} inside");
    }

    #[test]
    fn rejects_out_of_range_scores() {
        let raw = r#"{"score_a": 6, "score_b": 2, "winner": "A"}"#;
        assert!(matches!(
            parse_evaluation_response(raw),
            Err(EvaluatorError::Parse(_))
        ));
        let raw = r#"{"score_a": 2.5, "score_b": 2, "winner": "A"}"#;
        assert!(parse_evaluation_response(raw).is_err());
    }

    #[test]
    fn rejects_unknown_winner_and_missing_scores() {
        assert!(parse_evaluation_response(r#"{"score_a": 2, "score_b": 2, "winner": "C"}"#).is_err());
        assert!(parse_evaluation_response(r#"{"score_a": 2, "winner": "A"}"#).is_err());
        assert!(parse_evaluation_response("no json here").is_err());
    }

    #[test]
    fn na_winner() {
        let eval = parse_evaluation_response(r#"{"score_a": 1, "score_b": 1, "winner": "N/A"}"#)
            .unwrap();
        assert_eq!(eval.winner, CriterionWinner::NotApplicable);
    }
}
