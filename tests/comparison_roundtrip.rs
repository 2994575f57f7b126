use rankcentral::rank::build_result;
use rankcentral::{ComparisonResult, CriterionEvaluation, CriterionWinner, Document, RankingOutcome};
use serde_json::json;

fn evaluation(winner: CriterionWinner) -> CriterionEvaluation {
    CriterionEvaluation {
        criterion_id: "clarity".into(),
        criterion_name: "Clarity".into(),
        score_a: 5,
        score_b: 2,
        analysis_a: "precise".into(),
        analysis_b: "vague".into(),
        comparative_analysis: "first is clearer".into(),
        reasoning: "fewer hedges".into(),
        winner,
    }
}

#[test]
fn judged_result_survives_json() {
    let a = Document::new("a", "text").with_name("Alpha");
    let b = Document::new("b", "text").with_name("Beta");
    let result = build_result(&a, &b, 100.0, 40.0, vec![evaluation(CriterionWinner::A)]);

    let raw = serde_json::to_string(&result).unwrap();
    let back: ComparisonResult = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, result);

    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["docA"], "a");
    assert_eq!(value["weightedScoreA"], 100.0);
    assert_eq!(value["evaluations"][0]["scoreB"], 2);
    assert!(value.get("error").is_none());
}

#[test]
fn failed_result_keeps_error_through_json() {
    let result = ComparisonResult::failed(
        "a",
        "b",
        "Comparison failed: timed out.".into(),
        "evaluator timed out after 1s".into(),
    );
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["error"], "evaluator timed out after 1s");
    assert_eq!(value["winner"], serde_json::Value::Null);

    let back: ComparisonResult = serde_json::from_value(value).unwrap();
    assert!(back.is_error());
    assert_eq!(back, result);
}

#[test]
fn outcome_reads_canonical_names() {
    let outcome: RankingOutcome = serde_json::from_value(json!({
        "ranking": ["b", "a"],
        "allResults": [{
            "docA": "a",
            "docB": "b",
            "winner": "b",
            "weightedScoreA": 20.0,
            "weightedScoreB": 60.0,
            "evaluations": [{
                "criterionId": "c",
                "criterionName": "Clarity",
                "scoreA": 1,
                "scoreB": 3,
                "analysisA": "",
                "analysisB": "",
                "comparativeAnalysis": "",
                "reasoning": "",
                "winner": "B"
            }],
            "explanation": "b wins"
        }]
    }))
    .unwrap();

    assert_eq!(outcome.top_ranked(), Some("b"));
    assert_eq!(outcome.all_results[0].evaluations[0].winner, CriterionWinner::B);
    assert!(outcome.all_results[0].error.is_none());
}
