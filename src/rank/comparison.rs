//! Pairwise comparison across a weighted rubric.
//!
//! One evaluator call per criterion; raw 1-5 scores are weighted and summed per
//! document, and the larger total wins. Failures never escape `compare`: they
//! come back as a `ComparisonResult` with `error` set.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::evaluator::{Evaluator, EvaluatorError};
use crate::prompts::{generation_budget, render_within_budget, PromptDocument};

use super::options::RankConfig;
use super::types::{ComparisonResult, Criterion, CriterionEvaluation, CriterionWinner, Document};

/// Highest score on the rubric scale.
pub const MAX_SCORE: f64 = 5.0;

const CLOSING_SENTENCE: &str =
    "This assessment combines independent rubric-based scoring with direct comparative analysis.";

/// Weighted contribution of one raw score: `score / 5 * weight`.
pub fn weighted_contribution(score: u8, weight: f64) -> f64 {
    (f64::from(score) / MAX_SCORE) * weight
}

/// Applies a rubric to one document pair.
#[derive(Clone)]
pub struct PairComparator {
    evaluator: Arc<dyn Evaluator>,
    config: RankConfig,
}

impl PairComparator {
    pub fn new(evaluator: Arc<dyn Evaluator>, config: RankConfig) -> Self {
        Self { evaluator, config }
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    /// Judge `doc_a` against `doc_b` on every criterion, in rubric order.
    ///
    /// Any failure discards the evaluations gathered so far.
    pub async fn compare(
        &self,
        doc_a: &Document,
        doc_b: &Document,
        criteria: &[Criterion],
        run_id: Uuid,
    ) -> ComparisonResult {
        if let Err(err) = self.evaluator.validate() {
            warn!(doc_a = %doc_a.id, doc_b = %doc_b.id, error = %err, "Evaluator credentials rejected");
            return ComparisonResult::failed(
                &doc_a.id,
                &doc_b.id,
                format!("Comparison failed: evaluator credentials are invalid or missing ({err})."),
                err.to_string(),
            );
        }

        match self.judge(doc_a, doc_b, criteria, run_id).await {
            Ok(result) => result,
            Err(err) => {
                warn!(doc_a = %doc_a.id, doc_b = %doc_b.id, error = %err, "Pair comparison failed");
                ComparisonResult::failed(
                    &doc_a.id,
                    &doc_b.id,
                    format!("Comparison failed: {err}."),
                    err.to_string(),
                )
            }
        }
    }

    async fn judge(
        &self,
        doc_a: &Document,
        doc_b: &Document,
        criteria: &[Criterion],
        run_id: Uuid,
    ) -> Result<ComparisonResult, EvaluatorError> {
        let mut evaluations = Vec::with_capacity(criteria.len());
        let mut weighted_a = 0.0;
        let mut weighted_b = 0.0;

        let side_a = PromptDocument::new(doc_a.display_name(), doc_a.content.as_str());
        let side_b = PromptDocument::new(doc_b.display_name(), doc_b.content.as_str());

        for criterion in criteria {
            if !self.is_usable(doc_a) || !self.is_usable(doc_b) {
                warn!(
                    criterion = %criterion.name,
                    doc_a = %doc_a.id,
                    doc_b = %doc_b.id,
                    min_chars = self.config.min_content_chars,
                    "Document content missing or too short; skipping criterion"
                );
                continue;
            }

            let custom = criterion.is_custom_prompt || self.config.custom_prompt_mode;
            let prompt =
                render_within_budget(criterion, custom, &side_a, &side_b, self.config.token_ceiling);
            let max_tokens = generation_budget(prompt.token_count(), self.config.token_ceiling);

            let limit = self.config.evaluator_timeout();
            let call = self.evaluator.evaluate(&prompt, max_tokens, run_id);
            let mut evaluation = timeout(limit, call)
                .await
                .map_err(|_| EvaluatorError::Timeout(limit))??;

            if evaluation.criterion_id.trim().is_empty() {
                evaluation.criterion_id = criterion.id.clone();
            }
            if evaluation.criterion_name.trim().is_empty() {
                evaluation.criterion_name = criterion.name.clone();
            }

            weighted_a += weighted_contribution(evaluation.score_a, criterion.weight);
            weighted_b += weighted_contribution(evaluation.score_b, criterion.weight);
            debug!(
                criterion = %criterion.name,
                score_a = evaluation.score_a,
                score_b = evaluation.score_b,
                winner = evaluation.winner.as_str(),
                "Criterion judged"
            );
            evaluations.push(evaluation);
        }

        Ok(build_result(doc_a, doc_b, weighted_a, weighted_b, evaluations))
    }

    fn is_usable(&self, doc: &Document) -> bool {
        doc.content.trim().chars().count() >= self.config.min_content_chars
    }
}

/// Decide the pair's winner from the weighted totals and explain it.
pub fn build_result(
    doc_a: &Document,
    doc_b: &Document,
    weighted_a: f64,
    weighted_b: f64,
    evaluations: Vec<CriterionEvaluation>,
) -> ComparisonResult {
    let (winner, side) = if weighted_a > weighted_b {
        (Some(doc_a), CriterionWinner::A)
    } else if weighted_b > weighted_a {
        (Some(doc_b), CriterionWinner::B)
    } else {
        (None, CriterionWinner::Tie)
    };

    let matching: Vec<&str> = evaluations
        .iter()
        .filter(|e| e.winner == side)
        .map(|e| e.criterion_name.as_str())
        .collect();

    let mut explanation = match winner {
        Some(doc) => {
            let (own, other) = if side == CriterionWinner::A {
                (weighted_a, weighted_b)
            } else {
                (weighted_b, weighted_a)
            };
            format!(
                "{} wins with a weighted score of {own:.2} vs {other:.2}.",
                doc.display_name()
            )
        }
        None => format!(
            "The documents are tied with equal weighted scores of {weighted_a:.2} and {weighted_b:.2}."
        ),
    };

    if !matching.is_empty() {
        match winner {
            Some(doc) => explanation.push_str(&format!(
                " {} performed better in: {}.",
                doc.display_name(),
                matching.join(", ")
            )),
            None => explanation.push_str(&format!(
                " They were evenly matched in: {}.",
                matching.join(", ")
            )),
        }
    }
    explanation.push(' ');
    explanation.push_str(CLOSING_SENTENCE);

    ComparisonResult {
        doc_a: doc_a.id.clone(),
        doc_b: doc_b.id.clone(),
        winner: winner.map(|d| d.id.clone()),
        weighted_score_a: weighted_a,
        weighted_score_b: weighted_b,
        evaluations,
        explanation,
        error: None,
    }
}
