//! OpenAI-compatible client against a mock HTTP server.

use estuary::summarizer::{CompletionClient, CompletionError, CompletionRequest, OpenAiClient};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4o-mini".into(),
        system: "You are an editor.".into(),
        prompt: "Summarize 3 articles".into(),
        temperature: 0.5,
        max_tokens: 4000,
    }
}

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new("sk-test")
        .unwrap()
        .with_base_url(format!("{}/v1", server.uri()))
}

#[tokio::test]
async fn test_successful_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "max_tokens": 4000,
            "messages": [
                {"role": "system", "content": "You are an editor."},
                {"role": "user", "content": "Summarize 3 articles"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "<h2>Digest</h2>"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = client(&server).complete(&request()).await.unwrap();

    assert_eq!(completion.text, "<h2>Digest</h2>");
    assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
    assert_eq!(completion.total_tokens, 150);
}

#[tokio::test]
async fn test_missing_usage_counts_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let completion = client(&server).complete(&request()).await.unwrap();

    assert_eq!(completion.total_tokens, 0);
    assert_eq!(completion.model, "gpt-4o-mini");
}

#[tokio::test]
async fn test_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).complete(&request()).await.unwrap_err();

    assert!(matches!(err, CompletionError::RateLimited(ref msg) if msg == "Rate limit reached"));
}

#[tokio::test]
async fn test_api_error_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key provided"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).complete(&request()).await.unwrap_err();

    match err {
        CompletionError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).complete(&request()).await.unwrap_err();

    assert!(matches!(err, CompletionError::Api { status: 502, ref message } if message == "bad gateway"));
}

#[tokio::test]
async fn test_invalid_json_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).complete(&request()).await.unwrap_err();

    assert!(matches!(err, CompletionError::Unexpected(_)));
}

#[tokio::test]
async fn test_empty_choices_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": []
        })))
        .mount(&server)
        .await;

    let err = client(&server).complete(&request()).await.unwrap_err();

    assert!(matches!(err, CompletionError::Unexpected(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let server = MockServer::start().await;
    let base = format!("{}/v1", server.uri());
    drop(server);

    let err = OpenAiClient::new("sk-test")
        .unwrap()
        .with_base_url(base)
        .complete(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Connection(_)));
}
