//! Request/response types for pairwise document ranking.
//!
//! Field names serialize in camelCase; these are the canonical names consumed
//! by reporting and persisted by callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Inputs
// =============================================================================

/// A document to rank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Document {
    /// Stable identifier for the document.
    pub id: String,
    /// Extracted text shown to the evaluator.
    pub content: String,
    /// Human-readable name used in prompts and explanations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name shown to the evaluator. Falls back to the id.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.id,
        }
    }
}

/// One weighted dimension of the evaluation rubric.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Relative weight. Normalized so the rubric sums to 100.
    #[serde(default)]
    pub weight: f64,
    /// Level (1..=5) -> what that level means for this criterion.
    #[serde(default)]
    pub scoring_levels: BTreeMap<u8, String>,
    /// Judge this criterion with the free-form instructions template.
    #[serde(default)]
    pub is_custom_prompt: bool,
    /// Free-form instructions for custom-prompt evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

impl Criterion {
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            weight,
            scoring_levels: BTreeMap::new(),
            is_custom_prompt: false,
            custom_prompt: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_custom_prompt(mut self, instructions: impl Into<String>) -> Self {
        self.is_custom_prompt = true;
        self.custom_prompt = Some(instructions.into());
        self
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Which side the evaluator preferred on a single criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CriterionWinner {
    A,
    B,
    Tie,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl CriterionWinner {
    /// The same verdict with the document roles exchanged.
    pub fn swapped(self) -> Self {
        match self {
            CriterionWinner::A => CriterionWinner::B,
            CriterionWinner::B => CriterionWinner::A,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionWinner::A => "A",
            CriterionWinner::B => "B",
            CriterionWinner::Tie => "Tie",
            CriterionWinner::NotApplicable => "N/A",
        }
    }
}

/// Result of judging one pair on one criterion.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionEvaluation {
    pub criterion_id: String,
    pub criterion_name: String,
    pub score_a: u8,
    pub score_b: u8,
    pub analysis_a: String,
    pub analysis_b: String,
    pub comparative_analysis: String,
    pub reasoning: String,
    pub winner: CriterionWinner,
}

impl CriterionEvaluation {
    /// The same evaluation seen from the other document's side.
    pub fn swapped(&self) -> Self {
        Self {
            criterion_id: self.criterion_id.clone(),
            criterion_name: self.criterion_name.clone(),
            score_a: self.score_b,
            score_b: self.score_a,
            analysis_a: self.analysis_b.clone(),
            analysis_b: self.analysis_a.clone(),
            comparative_analysis: self.comparative_analysis.clone(),
            reasoning: self.reasoning.clone(),
            winner: self.winner.swapped(),
        }
    }
}

/// Result of judging one pair across the whole rubric.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub doc_a: String,
    pub doc_b: String,
    /// Winning document id; `None` is a tie.
    pub winner: Option<String>,
    pub weighted_score_a: f64,
    pub weighted_score_b: f64,
    pub evaluations: Vec<CriterionEvaluation>,
    pub explanation: String,
    /// Set when the pair was not actually judged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComparisonResult {
    /// An unjudged pair: tie, zero scores, no evaluations.
    pub fn failed(doc_a: &str, doc_b: &str, explanation: String, error: String) -> Self {
        Self {
            doc_a: doc_a.to_string(),
            doc_b: doc_b.to_string(),
            winner: None,
            weighted_score_a: 0.0,
            weighted_score_b: 0.0,
            evaluations: Vec::new(),
            explanation,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The same record with document roles exchanged.
    ///
    /// `winner` still names the same document id.
    pub fn swapped(&self) -> Self {
        Self {
            doc_a: self.doc_b.clone(),
            doc_b: self.doc_a.clone(),
            winner: self.winner.clone(),
            weighted_score_a: self.weighted_score_b,
            weighted_score_b: self.weighted_score_a,
            evaluations: self
                .evaluations
                .iter()
                .map(CriterionEvaluation::swapped)
                .collect(),
            explanation: self.explanation.clone(),
            error: self.error.clone(),
        }
    }
}

/// Output of one ranking run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingOutcome {
    /// Document ids, best first.
    pub ranking: Vec<String>,
    /// Every distinct pair judged during the run.
    pub all_results: Vec<ComparisonResult>,
}

impl RankingOutcome {
    pub fn top_ranked(&self) -> Option<&str> {
        self.ranking.first().map(String::as_str)
    }
}

/// Ranking request as read from JSON by the CLI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankRequest {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}
