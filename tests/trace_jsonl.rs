use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use rankcentral::evaluator::{Evaluator, EvaluatorError};
use rankcentral::prompts::EvaluationPrompt;
use rankcentral::rank::{ComparisonTrace, JsonlTraceSink, RankConfig, RankingEngine, TraceSink};
use rankcentral::{Criterion, CriterionEvaluation, CriterionWinner, Document};
use tempfile::tempdir;

#[derive(Debug, serde::Deserialize)]
struct TraceRow {
    run_id: String,
    comparison_index: usize,
    doc_a_hash: String,
    criteria_judged: usize,
}

fn make_trace(comparison_index: usize) -> ComparisonTrace {
    ComparisonTrace {
        timestamp_ms: 0,
        run_id: "run".to_string(),
        comparison_index,
        doc_a: "a".to_string(),
        doc_b: "b".to_string(),
        doc_a_hash: "a_hash".to_string(),
        doc_b_hash: "b_hash".to_string(),
        criteria_judged: 2,
        winner: Some("a".to_string()),
        weighted_score_a: 80.0,
        weighted_score_b: 60.0,
        latency_ms: 12,
        error: None,
    }
}

#[test]
fn jsonl_trace_sink_writes_events_and_flushes_on_join() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");

    let (sink, writer) = JsonlTraceSink::create(&path).unwrap();
    sink.record(make_trace(1)).unwrap();
    sink.record(make_trace(2)).unwrap();

    drop(sink);
    writer.finish().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: TraceRow = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first.comparison_index, 1);
    assert_eq!(first.criteria_judged, 2);
}

/// Prefers whichever document is shown first.
struct FirstWins;

#[async_trait]
impl Evaluator for FirstWins {
    async fn evaluate(
        &self,
        _prompt: &EvaluationPrompt,
        _max_tokens: u32,
        _run_id: Uuid,
    ) -> Result<CriterionEvaluation, EvaluatorError> {
        Ok(CriterionEvaluation {
            criterion_id: String::new(),
            criterion_name: String::new(),
            score_a: 5,
            score_b: 3,
            analysis_a: String::new(),
            analysis_b: String::new(),
            comparative_analysis: String::new(),
            reasoning: String::new(),
            winner: CriterionWinner::A,
        })
    }
}

#[tokio::test]
async fn ranking_traces_one_line_per_judged_pair() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rank.jsonl");
    let (sink, writer) = JsonlTraceSink::create(&path).unwrap();

    let docs: Vec<Document> = ["p", "q", "r", "s"]
        .iter()
        .map(|id| {
            Document::new(
                *id,
                format!("Document {id} carries enough words to pass the minimum length check."),
            )
        })
        .collect();
    let engine = RankingEngine::new(
        Arc::new(FirstWins),
        &[Criterion::new("c", "Clarity", 1.0)],
        RankConfig::default(),
    )
    .with_trace(Arc::new(sink));

    let outcome = engine.rank(&docs).await;
    drop(engine);
    writer.finish().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<TraceRow> = raw
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(rows.len(), outcome.all_results.len());
    assert!(rows.iter().all(|r| r.run_id == rows[0].run_id));
    let mut indices: Vec<usize> = rows.iter().map(|r| r.comparison_index).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..rows.len()).collect::<Vec<_>>());
    assert_eq!(rows[0].doc_a_hash.len(), 64);
}
