//! Rubric repair and weight normalization.
//!
//! Malformed rubrics are repaired rather than rejected: missing ids, names and
//! scoring levels are filled in, bad weights get a default, and the weights are
//! rescaled to sum to 100.

use std::collections::BTreeMap;

use crate::rank::types::Criterion;

/// Weight assigned to criteria with a missing, non-finite or non-positive weight.
pub const DEFAULT_WEIGHT: f64 = 25.0;

/// Target sum of all criterion weights after normalization.
pub const WEIGHT_TOTAL: f64 = 100.0;

const WEIGHT_EPSILON: f64 = 1e-9;

/// Generic 1-5 level descriptions used when a criterion supplies none.
pub const DEFAULT_SCORING_LEVELS: [(u8, &str); 5] = [
    (1, "Poor: fails to meet the criterion in most respects."),
    (2, "Fair: meets the criterion only partially, with significant gaps."),
    (3, "Good: meets the criterion adequately with some weaknesses."),
    (4, "Very good: meets the criterion well with minor weaknesses."),
    (5, "Excellent: fully meets the criterion with no meaningful weaknesses."),
];

/// Repair and normalize a rubric.
///
/// Never fails. If the weights sum to zero the rescale step is skipped.
pub fn normalize(criteria: &[Criterion]) -> Vec<Criterion> {
    let mut repaired: Vec<Criterion> = criteria
        .iter()
        .enumerate()
        .map(|(idx, c)| repair(idx, c))
        .collect();

    let total: f64 = repaired.iter().map(|c| c.weight).sum();
    if total > 0.0 && (total - WEIGHT_TOTAL).abs() > WEIGHT_EPSILON {
        for c in &mut repaired {
            c.weight = c.weight * WEIGHT_TOTAL / total;
        }
    }
    repaired
}

fn repair(idx: usize, c: &Criterion) -> Criterion {
    let mut out = c.clone();
    if out.id.trim().is_empty() {
        out.id = idx.to_string();
    }
    if out.name.trim().is_empty() {
        out.name = format!("Criterion {}", idx + 1);
    }
    if !out.weight.is_finite() || out.weight <= 0.0 {
        out.weight = DEFAULT_WEIGHT;
    }
    out.scoring_levels = complete_levels(&out.scoring_levels);
    out
}

fn complete_levels(levels: &BTreeMap<u8, String>) -> BTreeMap<u8, String> {
    DEFAULT_SCORING_LEVELS
        .iter()
        .map(|(level, fallback)| {
            let text = levels
                .get(level)
                .filter(|t| !t.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| fallback.to_string());
            (*level, text)
        })
        .collect()
}

/// Stock rubric used when a request carries no criteria.
pub fn default_criteria() -> Vec<Criterion> {
    let specs = [
        (
            "clarity",
            "Clarity",
            "How clearly and precisely the document communicates its ideas.",
        ),
        (
            "relevance",
            "Relevance",
            "How well the content addresses its stated purpose and audience.",
        ),
        (
            "thoroughness",
            "Thoroughness",
            "How completely the document covers the subject, with supporting detail.",
        ),
        (
            "structure",
            "Structure",
            "How logically the document is organized and how easy it is to follow.",
        ),
    ];
    let criteria: Vec<Criterion> = specs
        .iter()
        .map(|(id, name, description)| {
            Criterion::new(*id, *name, DEFAULT_WEIGHT).with_description(*description)
        })
        .collect();
    normalize(&criteria)
}
