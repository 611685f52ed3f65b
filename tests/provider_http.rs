//! HTTP behaviour of the provider clients against a mock server.

use std::time::Duration;

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;

use loclm_lib::core::ConversationTurn;
use loclm_lib::model::{ChatModel, ModelError, OllamaClient, OpenAiCompatClient, ProviderId};

fn messages() -> Vec<ConversationTurn> {
    vec![
        ConversationTurn::system("You are a helpful AI coding assistant."),
        ConversationTurn::user("hello"),
    ]
}

fn groq(server: &MockServer, key: &str) -> OpenAiCompatClient {
    OpenAiCompatClient::new(
        ProviderId::Groq,
        key.to_string(),
        Some("llama-3.3-70b-versatile".to_string()),
        Some(format!("{}/openai/v1", server.base_url())),
        Duration::from_secs(5),
    )
    .expect("client should build")
}

#[tokio::test]
async fn openai_compat_sends_history_and_reads_first_choice() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/openai/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .body_contains("\"model\":\"llama-3.3-70b-versatile\"")
            .body_contains("\"max_tokens\":4096")
            .body_contains("\"role\":\"system\"")
            .body_contains("\"content\":\"hello\"");
        then.status(200).json_body(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Hi there!" } }
            ]
        }));
    });

    let reply = groq(&server, "test-key")
        .chat(&messages())
        .await
        .expect("chat should succeed");

    mock.assert();
    assert_eq!(reply, "Hi there!");
}

#[tokio::test]
async fn openai_compat_maps_auth_failures() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(401).body("invalid api key");
    });

    let err = groq(&server, "bad").chat(&messages()).await.unwrap_err();
    assert!(matches!(err, ModelError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn openai_compat_truncates_error_bodies() {
    let server = MockServer::start();
    let body = "x".repeat(1000);
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(500).body(body.as_str());
    });

    let err = groq(&server, "k").chat(&messages()).await.unwrap_err();
    let ModelError::Request(message) = err else {
        panic!("expected request error, got {err:?}");
    };
    assert!(message.contains("500"), "{message}");
    assert!(message.ends_with(&"x".repeat(200)));
    assert!(!message.contains(&"x".repeat(201)));
}

#[tokio::test]
async fn openai_compat_empty_content_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(200)
            .json_body(json!({ "choices": [ { "message": { "content": null } } ] }));
    });

    let err = groq(&server, "k").chat(&messages()).await.unwrap_err();
    assert!(matches!(err, ModelError::Empty(_)), "{err:?}");
}

#[tokio::test]
async fn openai_compat_health_probes_models_endpoint() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/openai/v1/models")
            .header("authorization", "Bearer k");
        then.status(200).json_body(json!({ "data": [] }));
    });

    assert!(groq(&server, "k").health_check().await);
    mock.assert();
}

#[tokio::test]
async fn health_check_is_false_when_unreachable() {
    let client = OpenAiCompatClient::new(
        ProviderId::OpenAi,
        "k".to_string(),
        None,
        Some("http://127.0.0.1:9/v1".to_string()),
        Duration::from_secs(1),
    )
    .unwrap();
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn ollama_uses_native_chat_api() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("\"stream\":false")
            .body_contains("\"model\":\"llama3.2:3b\"");
        then.status(200).json_body(json!({
            "model": "llama3.2:3b",
            "message": { "role": "assistant", "content": "local hello" },
            "done": true
        }));
    });

    let client = OllamaClient::new(None, Some(server.base_url()), Duration::from_secs(5)).unwrap();
    let reply = client.chat(&messages()).await.unwrap();

    mock.assert();
    assert_eq!(reply, "local hello");
    assert_eq!(client.provider_name(), "Ollama");
}

#[tokio::test]
async fn ollama_health_uses_tags_endpoint() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200).json_body(json!({ "models": [] }));
    });

    let client = OllamaClient::new(None, Some(server.base_url()), Duration::from_secs(5)).unwrap();
    assert!(client.health_check().await);

    let down = OllamaClient::new(None, Some(format!("{}/nowhere", server.base_url())), Duration::from_secs(5))
        .unwrap();
    assert!(!down.health_check().await);
}
