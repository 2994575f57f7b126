use std::process::Command;

use rankcentral::{Criterion, RankingOutcome};
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn cli_normalize_rescales_weights() {
    let dir = tempdir().unwrap();
    let rubric = dir.path().join("rubric.json");
    std::fs::write(
        &rubric,
        json!([{"name": "Depth", "weight": 3}, {"name": "Style", "weight": 1}]).to_string(),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_rankcentral"))
        .arg("normalize")
        .arg("--rubric")
        .arg(&rubric)
        .output()
        .unwrap();
    assert!(output.status.success());

    let criteria: Vec<Criterion> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(criteria.len(), 2);
    assert_eq!(criteria[0].id, "0");
    assert!((criteria[0].weight - 75.0).abs() < 1e-9);
    assert_eq!(criteria[1].scoring_levels.len(), 5);
}

#[test]
fn cli_rank_fails_without_api_key() {
    let dir = tempdir().unwrap();
    let request = dir.path().join("request.json");
    std::fs::write(
        &request,
        json!({"documents": [{"id": "a", "content": "x"}]}).to_string(),
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_rankcentral"))
        .env_remove("RANKCENTRAL_API_KEY")
        .args(["rank", "--request"])
        .arg(&request)
        .arg("--out")
        .arg(dir.path().join("out.json"))
        .status()
        .unwrap();
    assert!(!status.success());
}

#[tokio::test(flavor = "multi_thread")]
async fn cli_rank_writes_outcome_and_report() {
    let server = MockServer::start().await;
    let verdict = json!({
        "score_a": 5, "score_b": 2,
        "analysis_a": "", "analysis_b": "", "comparative_analysis": "", "reasoning": "",
        "winner": "A"
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": verdict}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 10}
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let request = dir.path().join("request.json");
    let out = dir.path().join("out.json");
    let report = dir.path().join("report.md");
    let body = "A paragraph of text that is comfortably longer than fifty characters.";
    std::fs::write(
        &request,
        json!({"documents": [
            {"id": "a", "content": body},
            {"id": "b", "content": body}
        ]})
        .to_string(),
    )
    .unwrap();

    let base_url = server.uri();
    let (out_path, report_path) = (out.clone(), report.clone());
    let status = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_rankcentral"))
            .env("RANKCENTRAL_API_KEY", "sk-test")
            .env("RANKCENTRAL_BASE_URL", base_url)
            .args(["rank", "--request"])
            .arg(&request)
            .arg("--out")
            .arg(&out_path)
            .arg("--report")
            .arg(&report_path)
            .status()
            .unwrap()
    })
    .await
    .unwrap();
    assert!(status.success());

    let outcome: RankingOutcome =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(outcome.ranking, vec!["a", "b"]);
    assert_eq!(outcome.all_results.len(), 1);
    // Default rubric has four criteria.
    assert_eq!(outcome.all_results[0].evaluations.len(), 4);

    let md = std::fs::read_to_string(&report).unwrap();
    assert!(md.contains("- Top ranked: a"));
}

#[tokio::test(flavor = "multi_thread")]
async fn cli_rank_flushes_trace_when_output_write_fails() {
    let server = MockServer::start().await;
    let verdict = json!({
        "score_a": 3, "score_b": 4,
        "analysis_a": "", "analysis_b": "", "comparative_analysis": "", "reasoning": "",
        "winner": "B"
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": verdict}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 10}
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let request = dir.path().join("request.json");
    let trace = dir.path().join("trace.jsonl");
    let unwritable = dir.path().join("missing").join("out.json");
    let body = "A paragraph of text that is comfortably longer than fifty characters.";
    std::fs::write(
        &request,
        json!({
            "documents": [{"id": "a", "content": body}, {"id": "b", "content": body}],
            "criteria": [{"name": "Clarity", "weight": 1}]
        })
        .to_string(),
    )
    .unwrap();

    let base_url = server.uri();
    let trace_path = trace.clone();
    let status = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_rankcentral"))
            .env("RANKCENTRAL_API_KEY", "sk-test")
            .env("RANKCENTRAL_BASE_URL", base_url)
            .args(["rank", "--request"])
            .arg(&request)
            .arg("--out")
            .arg(&unwritable)
            .arg("--trace")
            .arg(&trace_path)
            .status()
            .unwrap()
    })
    .await
    .unwrap();
    assert!(!status.success());

    let raw = std::fs::read_to_string(&trace).unwrap();
    assert_eq!(raw.lines().count(), 1);
    let line: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    assert_eq!(line["winner"], "b");
}
