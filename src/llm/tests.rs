use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> LlmConfig {
    LlmConfig {
        base_url: format!("{}/openai/v1/", server.uri()),
        model: "test-model".to_string(),
        api_key: Some("test-key".to_string()),
        ..LlmConfig::default()
    }
}

#[test]
fn endpoint_joins_base_url() {
    let client = ChatClient::new(&LlmConfig::default()).expect("client should build");

    assert_eq!(
        client.endpoint().as_str(),
        "https://api.groq.com/openai/v1/chat/completions"
    );
    assert_eq!(client.model(), "llama-3.1-8b-instant");
}

#[test]
fn debug_output_redacts_api_key() {
    let client = ChatClient::new(&LlmConfig {
        api_key: Some("super-secret".to_string()),
        ..LlmConfig::default()
    })
    .expect("client should build");

    let rendered = format!("{client:?}");

    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("<redacted>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn prompt_sent_as_single_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(json!({
            "model": "test-model",
            "messages": [{"role": "user", "content": "What is the capital of France?"}],
            "temperature": 0.2,
            "top_p": 0.9,
            "max_tokens": 512,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Paris."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server)).expect("client should build");
    let answer = tokio::task::spawn_blocking(move || {
        client.invoke("What is the capital of France?")
    })
    .await
    .expect("blocking task should not panic")
    .expect("invoke should succeed");

    assert_eq!(answer, "Paris.");
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_choices_is_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server)).expect("client should build");
    let result = tokio::task::spawn_blocking(move || client.invoke("hello"))
        .await
        .expect("blocking task should not panic");

    assert!(matches!(result, Err(RagError::Llm(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_request_is_llm_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API Key"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&LlmConfig {
        api_key: None,
        ..config_for(&server)
    })
    .expect("client should build");
    let result = tokio::task::spawn_blocking(move || client.invoke("hello"))
        .await
        .expect("blocking task should not panic");

    match result {
        Err(RagError::Llm(message)) => assert!(message.contains("HTTP 401")),
        other => panic!("expected LLM error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_token_cap_omits_max_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(body_json(json!({
            "model": "test-model",
            "messages": [{"role": "user", "content": "Hello"}],
            "temperature": 0.2,
            "top_p": 0.9,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&LlmConfig {
        max_tokens: 0,
        ..config_for(&server)
    })
    .expect("client should build");
    let answer = tokio::task::spawn_blocking(move || client.invoke("Hello"))
        .await
        .expect("blocking task should not panic")
        .expect("invoke should succeed");

    assert_eq!(answer, "Hi.");
}
