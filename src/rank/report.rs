//! Report generation for ranking runs.

use std::collections::HashMap;

use serde::Serialize;

use super::types::{CriterionWinner, RankingOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct RankReport {
    pub top_ranked: Option<String>,
    pub summary: ReportSummary,
    pub documents: Vec<ReportDocument>,
    pub criteria: Vec<ReportCriterion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub documents: usize,
    pub pairs_judged: usize,
    pub pairs_failed: usize,
    pub pairs_tied: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportDocument {
    pub id: String,
    /// 1-based position in the ranking.
    pub position: usize,
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportCriterion {
    pub name: String,
    pub evaluations: usize,
    pub mean_score_a: f64,
    pub mean_score_b: f64,
    pub wins_a: usize,
    pub wins_b: usize,
    pub ties: usize,
    pub not_applicable: usize,
}

pub fn build_report(outcome: &RankingOutcome) -> RankReport {
    let mut documents: Vec<ReportDocument> = outcome
        .ranking
        .iter()
        .enumerate()
        .map(|(idx, id)| ReportDocument {
            id: id.clone(),
            position: idx + 1,
            ..Default::default()
        })
        .collect();
    let index: HashMap<String, usize> = outcome
        .ranking
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.clone(), idx))
        .collect();

    let mut pairs_failed = 0;
    let mut pairs_tied = 0;
    let mut criteria: Vec<ReportCriterion> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut sums: Vec<(u64, u64)> = Vec::new();

    for result in &outcome.all_results {
        let a = index.get(&result.doc_a).copied();
        let b = index.get(&result.doc_b).copied();

        if result.is_error() {
            pairs_failed += 1;
            for slot in [a, b].into_iter().flatten() {
                documents[slot].failed += 1;
            }
            continue;
        }

        match result.winner.as_deref() {
            None => {
                pairs_tied += 1;
                for slot in [a, b].into_iter().flatten() {
                    documents[slot].ties += 1;
                }
            }
            Some(winner) => {
                let (win, lose) = if winner == result.doc_a { (a, b) } else { (b, a) };
                if let Some(w) = win {
                    documents[w].wins += 1;
                }
                if let Some(l) = lose {
                    documents[l].losses += 1;
                }
            }
        }

        for eval in &result.evaluations {
            let slot = *by_name
                .entry(eval.criterion_name.clone())
                .or_insert_with(|| {
                    criteria.push(ReportCriterion {
                        name: eval.criterion_name.clone(),
                        ..Default::default()
                    });
                    sums.push((0, 0));
                    criteria.len() - 1
                });
            let entry = &mut criteria[slot];
            entry.evaluations += 1;
            sums[slot].0 += u64::from(eval.score_a);
            sums[slot].1 += u64::from(eval.score_b);
            match eval.winner {
                CriterionWinner::A => entry.wins_a += 1,
                CriterionWinner::B => entry.wins_b += 1,
                CriterionWinner::Tie => entry.ties += 1,
                CriterionWinner::NotApplicable => entry.not_applicable += 1,
            }
        }
    }

    for (entry, (sum_a, sum_b)) in criteria.iter_mut().zip(sums) {
        if entry.evaluations > 0 {
            let n = entry.evaluations as f64;
            entry.mean_score_a = sum_a as f64 / n;
            entry.mean_score_b = sum_b as f64 / n;
        }
    }

    RankReport {
        top_ranked: outcome.top_ranked().map(String::from),
        summary: ReportSummary {
            documents: documents.len(),
            pairs_judged: outcome.all_results.len(),
            pairs_failed,
            pairs_tied,
        },
        documents,
        criteria,
    }
}

pub fn render_report_markdown(report: &RankReport) -> String {
    let mut out = String::new();
    out.push_str("# Ranking Report\n\n");
    out.push_str(&format!(
        "- Top ranked: {}\n",
        report.top_ranked.as_deref().unwrap_or("(none)")
    ));
    out.push_str(&format!("- Documents: {}\n", report.summary.documents));
    out.push_str(&format!("- Pairs judged: {}\n", report.summary.pairs_judged));
    out.push_str(&format!("- Pairs tied: {}\n", report.summary.pairs_tied));
    out.push_str(&format!("- Pairs failed: {}\n", report.summary.pairs_failed));

    out.push_str("\n## Ranking\n\n");
    out.push_str("| # | Document | Wins | Losses | Ties | Failed |\n");
    out.push_str("|---|----------|------|--------|------|--------|\n");
    for doc in &report.documents {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            doc.position, doc.id, doc.wins, doc.losses, doc.ties, doc.failed
        ));
    }

    if !report.criteria.is_empty() {
        out.push_str("\n## Criteria\n\n");
        for c in &report.criteria {
            out.push_str(&format!(
                "- {}: {} evaluations, mean {:.2} vs {:.2} (first wins {}, second wins {}, ties {}, n/a {})\n",
                c.name,
                c.evaluations,
                c.mean_score_a,
                c.mean_score_b,
                c.wins_a,
                c.wins_b,
                c.ties,
                c.not_applicable
            ));
        }
    }
    out
}
