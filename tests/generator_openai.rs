// tests/generator_openai.rs
//
// OpenAiGenerator against a local Chat Completions mock.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use donkee::compose::ai_adapter::{GenerateError, Generator, OpenAiGenerator, MAX_POST_CHARS};
use donkee::config::AiConfig;

fn cfg(key: &str) -> AiConfig {
    AiConfig {
        enabled: true,
        api_key: key.to_string(),
        ..AiConfig::default()
    }
}

#[tokio::test]
async fn completion_is_sanitized_to_one_post() {
    let server = MockServer::start().await;
    let long = format!("\"Donkeys\n\nare {}\"", "great ".repeat(80));
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 120 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": long } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let g = OpenAiGenerator::from_config(&cfg("sk-test")).with_base_url(server.uri());
    let out = g.generate("Topic: donkeys").await.unwrap();

    assert!(out.starts_with("Donkeys are great"));
    assert!(!out.contains('\n'));
    assert!(!out.starts_with('"'));
    assert!(out.chars().count() <= MAX_POST_CHARS);
}

#[tokio::test]
async fn provider_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
        .mount(&server)
        .await;

    let g = OpenAiGenerator::from_config(&cfg("sk-test")).with_base_url(server.uri());
    let err = g.generate("p").await.unwrap_err();
    assert!(matches!(err, GenerateError::Api { status: 429, .. }), "got {err:?}");
}

#[tokio::test]
async fn empty_completion_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "content": "  \"\"  " } } ]
        })))
        .mount(&server)
        .await;

    let g = OpenAiGenerator::from_config(&cfg("sk-test")).with_base_url(server.uri());
    assert!(matches!(g.generate("p").await, Err(GenerateError::Empty)));
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let g = OpenAiGenerator::from_config(&cfg("")).with_base_url(server.uri());
    assert!(matches!(
        g.generate("p").await,
        Err(GenerateError::MissingApiKey("openai"))
    ));
}
