use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veracity_harness::gateway::openrouter::OpenRouterAdapter;
use veracity_harness::gateway::usage::ProviderCallRecord;
use veracity_harness::gateway::{
    Attribution, ChatModel, ChatRequest, GatewayConfig, Message, NoopUsageSink, ProviderError,
    ProviderGateway, UsageSink,
};

async fn gateway_for(server: &MockServer, max_retries: u32) -> ProviderGateway<NoopUsageSink> {
    let adapter = OpenRouterAdapter::with_config(
        "test-key",
        server.uri(),
        Duration::from_secs(5),
        None,
        None,
    )
    .expect("adapter");
    ProviderGateway::with_config(
        adapter,
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries,
            retry_base_delay: Duration::from_millis(1),
        },
    )
}

fn request() -> ChatRequest {
    ChatRequest::new(
        ChatModel::openrouter("judge/alpha"),
        vec![Message::user("score this")],
        Attribution::new("test"),
    )
}

#[tokio::test]
async fn successful_chat_returns_content_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "{\"prospects\": []}" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 42, "completion_tokens": 7 }
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0).await;
    let resp = gateway.chat(request()).await.expect("chat");

    assert_eq!(resp.content, "{\"prospects\": []}");
    assert_eq!(resp.input_tokens, 42);
    assert_eq!(resp.output_tokens, 7);
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "slow down", "code": "rate_limit_exceeded" }
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0).await;
    let err = gateway.chat(request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::RateLimited { .. }));
}

#[tokio::test]
async fn refusal_content_maps_to_refused_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "I cannot evaluate this content." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0).await;
    let err = gateway.chat(request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Refused { .. }));
}

#[tokio::test]
async fn server_errors_retry_then_succeed() {
    let server = MockServer::start().await;

    // First attempt fails, retry succeeds.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "ok" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 2).await;
    let resp = gateway.chat(request()).await.expect("retried chat");
    assert_eq!(resp.content, "ok");
}

#[derive(Default)]
struct CapturingSink {
    records: Mutex<Vec<ProviderCallRecord>>,
}

#[async_trait]
impl UsageSink for CapturingSink {
    async fn record(&self, record: ProviderCallRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[tokio::test]
async fn request_id_reaches_usage_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req-123")
                .set_body_json(json!({
                    "choices": [{
                        "message": { "content": "ok" },
                        "finish_reason": "stop"
                    }],
                    "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
                })),
        )
        .mount(&server)
        .await;

    let adapter = OpenRouterAdapter::with_config(
        "test-key",
        server.uri(),
        Duration::from_secs(5),
        None,
        None,
    )
    .expect("adapter");
    let sink = Arc::new(CapturingSink::default());
    let gateway = ProviderGateway::with_config(
        adapter,
        sink.clone(),
        GatewayConfig {
            max_retries: 0,
            retry_base_delay: Duration::from_millis(1),
        },
    );

    let resp = gateway.chat(request()).await.expect("chat");
    assert_eq!(resp.request_id.as_deref(), Some("req-123"));

    let records = sink.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].request_id.as_deref(), Some("req-123"));
}

#[tokio::test]
async fn tool_call_arguments_back_content() {
    // Some models emit structured output via tool calls even in JSON mode.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{ "function": { "arguments": "{\"prospects\": []}" } }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, 0).await;
    let resp = gateway.chat(request()).await.expect("chat");
    assert_eq!(resp.content, "{\"prospects\": []}");
}
