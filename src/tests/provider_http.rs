//! Provider adapters against wiremock.

use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

use crate::{
    config::ProviderEndpointConfig,
    models::{CompletionRequest, OperationKind},
    providers::{Provider, ProviderError, gemini::GeminiProvider, open_ai::OpenAiProvider},
};

fn openai(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::from_config(&ProviderEndpointConfig {
        api_key: "sk-test".into(),
        base_url: server.uri(),
        model: "gpt-4o-mini".into(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn gemini(server: &MockServer) -> GeminiProvider {
    GeminiProvider::from_config(&ProviderEndpointConfig {
        api_key: "g-test".into(),
        base_url: server.uri(),
        model: "gemini-2.0-flash".into(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest::new(OperationKind::Parse, "John Doe, software engineer")
}

#[tokio::test]
async fn test_openai_success_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [
                { "message": { "role": "assistant", "content": "{\"name\":\"John Doe\"}" } }
            ],
            "usage": { "prompt_tokens": 57, "completion_tokens": 12, "total_tokens": 69 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = openai(&server);
    let client = reqwest::Client::new();
    let completion = provider.complete(&client, &request()).await.unwrap();

    assert_eq!(completion.text, "{\"name\":\"John Doe\"}");
    assert_eq!(completion.usage.input_tokens, 57);
    assert_eq!(completion.usage.output_tokens, 12);
    assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
}

#[tokio::test]
async fn test_openai_rate_limit_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "Rate limit reached", "type": "tokens" }
            })),
        )
        .mount(&server)
        .await;

    let provider = openai(&server);
    let client = reqwest::Client::new();
    let error = provider.complete(&client, &request()).await.unwrap_err();

    assert!(matches!(error, ProviderError::Http { status: 429, .. }));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_openai_bad_request_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": { "message": "invalid model" } })),
        )
        .mount(&server)
        .await;

    let provider = openai(&server);
    let client = reqwest::Client::new();
    let error = provider.complete(&client, &request()).await.unwrap_err();

    assert!(matches!(error, ProviderError::Http { status: 400, .. }));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_openai_empty_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": []
        })))
        .mount(&server)
        .await;

    let provider = openai(&server);
    let client = reqwest::Client::new();
    let error = provider.complete(&client, &request()).await.unwrap_err();

    assert!(matches!(error, ProviderError::InvalidResponse(_)));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_gemini_success_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "g-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"name\":\"John Doe\"}" }], "role": "model" } }
            ],
            "usageMetadata": { "promptTokenCount": 44, "candidatesTokenCount": 9 },
            "modelVersion": "gemini-2.0-flash-001"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = gemini(&server);
    let client = reqwest::Client::new();
    let completion = provider.complete(&client, &request()).await.unwrap();

    assert_eq!(completion.text, "{\"name\":\"John Doe\"}");
    assert_eq!(completion.usage.input_tokens, 44);
    assert_eq!(completion.usage.output_tokens, 9);
    assert_eq!(completion.model, "gemini-2.0-flash-001");
}

#[tokio::test]
async fn test_gemini_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({ "error": { "message": "The model is overloaded" } })),
        )
        .mount(&server)
        .await;

    let provider = gemini(&server);
    let client = reqwest::Client::new();
    let error = provider.complete(&client, &request()).await.unwrap_err();

    assert!(matches!(error, ProviderError::Http { status: 503, .. }));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_gemini_missing_candidates_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usageMetadata": { "promptTokenCount": 1, "candidatesTokenCount": 0 }
        })))
        .mount(&server)
        .await;

    let provider = gemini(&server);
    let client = reqwest::Client::new();
    let error = provider.complete(&client, &request()).await.unwrap_err();

    assert!(matches!(error, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_gemini_missing_usage_defaults_to_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "ok" }] } }
            ]
        })))
        .mount(&server)
        .await;

    let provider = gemini(&server);
    let client = reqwest::Client::new();
    let completion = provider.complete(&client, &request()).await.unwrap();

    assert_eq!(completion.usage.total(), 0);
    // Falls back to the configured model name.
    assert_eq!(completion.model, "gemini-2.0-flash");
}
