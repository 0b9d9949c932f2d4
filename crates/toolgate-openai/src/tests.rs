// Unit tests for the OpenAI-protocol driver

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::OpenAiDriver;
use toolgate_core::{ModelCallConfig, ModelDriver, ModelMessage, ModelRole, TaskError};

fn call_config(model: &str) -> ModelCallConfig {
    ModelCallConfig {
        model: model.to_string(),
        temperature: None,
        max_tokens: None,
        tools: Vec::new(),
    }
}

fn user_message(text: &str) -> Vec<ModelMessage> {
    vec![ModelMessage::text(ModelRole::User, text)]
}

async fn mock_completion(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

fn driver_for(server: &MockServer) -> OpenAiDriver {
    OpenAiDriver::with_base_url(
        "test-key",
        format!("{}/v1/chat/completions", server.uri()),
    )
}

#[test]
fn test_driver_with_api_key() {
    let driver = OpenAiDriver::new("test-key");
    let debug = format!("{:?}", driver);
    assert!(debug.contains("OpenAiDriver"));
    assert!(debug.contains("[REDACTED]"));
    assert!(!debug.contains("test-key"));
}

#[test]
fn test_driver_with_base_url() {
    let driver =
        OpenAiDriver::with_base_url("test-key", "https://custom.api.com/v1/chat/completions");
    assert_eq!(driver.api_url(), "https://custom.api.com/v1/chat/completions");
}

#[tokio::test]
async fn test_streams_text_and_usage() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":2,\"total_tokens\":12}}\n\n",
        "data: [DONE]\n\n",
    );
    mock_completion(&server, body).await;

    let driver = driver_for(&server);
    let response = driver
        .generate(user_message("hi"), &call_config("gpt-4o"))
        .await
        .unwrap();

    assert_eq!(response.text, "Hello");
    assert!(!response.has_tool_calls());
    assert_eq!(response.metadata.prompt_tokens, Some(10));
    assert_eq!(response.metadata.completion_tokens, Some(2));
    assert_eq!(response.metadata.total_tokens, Some(12));
    assert_eq!(response.metadata.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_accumulates_fragmented_tool_call_arguments() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"list_dir\",\"arguments\":\"\"}}]},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"path\\\"\"}}]},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\": \\\".\\\"}\"}}]},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    mock_completion(&server, body).await;

    let driver = driver_for(&server);
    let response = driver
        .generate(user_message("list it"), &call_config("gpt-4o"))
        .await
        .unwrap();

    let calls = response.tool_calls.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].name, "list_dir");
    assert_eq!(calls[0].arguments, serde_json::json!({"path": "."}));
}

#[tokio::test]
async fn test_malformed_arguments_fall_back_to_raw_string() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"list_dir\",\"arguments\":\"not valid json\"}}]},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    mock_completion(&server, body).await;

    let driver = driver_for(&server);
    let response = driver
        .generate(user_message("list it"), &call_config("gpt-4o"))
        .await
        .unwrap();

    let calls = response.tool_calls.unwrap();
    assert_eq!(
        calls[0].arguments,
        serde_json::Value::String("not valid json".to_string())
    );
}

#[tokio::test]
async fn test_api_error_status_becomes_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let err = driver
        .generate(user_message("hi"), &call_config("gpt-4o"))
        .await
        .unwrap_err();

    match err {
        TaskError::Model(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("upstream exploded"));
        }
        other => panic!("Expected model error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_usage_falls_back_to_delta_count() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"b\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"c\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    mock_completion(&server, body).await;

    let driver = driver_for(&server);
    let response = driver
        .generate(user_message("hi"), &call_config("gpt-4o"))
        .await
        .unwrap();

    assert_eq!(response.text, "abc");
    assert_eq!(response.metadata.prompt_tokens, None);
    assert_eq!(response.metadata.completion_tokens, Some(3));
}
