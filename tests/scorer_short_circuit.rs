use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use veracity_harness::gateway::{
    ChatGateway, ChatRequest, ChatResponse, FinishReason, ProviderError,
};
use veracity_harness::ledger::{ToolCall, TranscriptMessage, SEARCH_TOOL};
use veracity_harness::{score_response, PanelConfig};

/// Gateway stub that counts calls and replies with a fixed verdict.
#[derive(Default)]
struct CountingGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatGateway for CountingGateway {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = json!({
            "prospects": [
                {"name": "A", "pain_score": 5, "insight_score": 5, "fit_score": 5, "reply_score": 5, "total": 20, "rationale": ""}
            ]
        })
        .to_string();
        Ok(ChatResponse {
            content,
            input_tokens: 10,
            output_tokens: 10,
            latency: Duration::from_millis(1),
            finish_reason: FinishReason::Stop,
            request_id: None,
        })
    }
}

fn config() -> PanelConfig {
    PanelConfig {
        judges: vec!["judge/alpha".to_string(), "judge/beta".to_string()],
        ..PanelConfig::default()
    }
}

fn search_transcript() -> Vec<TranscriptMessage> {
    vec![TranscriptMessage {
        role: "assistant".to_string(),
        content: String::new(),
        tool_calls: vec![ToolCall {
            name: SEARCH_TOOL.to_string(),
            arguments: json!({"query": "anything"}).as_object().cloned().unwrap(),
        }],
    }]
}

#[tokio::test]
async fn no_structure_and_no_tool_use_skips_judges() {
    let gateway = CountingGateway::default();

    let report = score_response(&gateway, &config(), &[], "total nonsense").await;

    assert_eq!(report.value, 0.0);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    assert!(report.explanation.contains("no tool usage"));
    assert_eq!(report.metadata["tool_usage"]["searches"], 0);
}

#[tokio::test]
async fn structural_absence_scores_zero_without_dispatch() {
    let gateway = CountingGateway::default();

    // Valid JSON, but no prospects array: no partial credit is attributable.
    let report = score_response(
        &gateway,
        &config(),
        &search_transcript(),
        r#"{"results": ["something else"]}"#,
    )
    .await;

    assert_eq!(report.value, 0.0);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    assert!(report.explanation.contains("prospects"));
}

#[tokio::test]
async fn tool_use_without_structure_still_dispatches() {
    let gateway = CountingGateway::default();

    let report = score_response(&gateway, &config(), &search_transcript(), "no json here").await;

    // One call per configured judge.
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    assert!(report.explanation.contains("0/3 verified"));
}

#[tokio::test]
async fn valid_answer_dispatches_every_judge_once() {
    let gateway = CountingGateway::default();

    let answer = json!({
        "prospects": [
            {"name": "Matthew Christy", "first_line": "hi", "evidence_url": "", "evidence_quote": ""}
        ]
    })
    .to_string();

    let report = score_response(&gateway, &config(), &search_transcript(), &answer).await;

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    // The stub verdict only covers slot 0; the padded slots median to 0.
    let prospect_scores = report.metadata["prospect_scores"].as_array().unwrap();
    assert_eq!(prospect_scores.len(), 3);
    assert_eq!(prospect_scores[1]["median_total"], 0.0);
}
