use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ai_api::tools::to_output;
use ai_api::{
    AiApi, AiApiConfig, ChatCompletion, ClientError, Message, ModelOptions, OpenAiClient,
    SignatureParam, Tool, TransportOptions,
};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn client(server: &MockServer, model: ModelOptions) -> OpenAiClient {
    OpenAiClient::with_options(
        "test-key",
        format!("{}/", server.uri()),
        model,
        TransportOptions::new()
            .with_timeout(Duration::from_secs(5))
            .with_header("x-trace", "abc"),
    )
    .unwrap()
}

#[tokio::test]
async fn sends_model_messages_and_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("x-trace", "abc"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.0,
            "max_tokens": 64,
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, ModelOptions::new("gpt-4o-mini").with_max_tokens(64));
    let reply = client
        .complete(vec![Message::system("Be brief."), Message::user("Hi")], Some(0.0))
        .await
        .unwrap();

    assert_eq!(reply, "Hello!");
}

#[tokio::test]
async fn provider_error_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = client(&server, ModelOptions::default())
        .complete(vec![Message::user("Hi")], None)
        .await
        .unwrap_err();

    match err {
        ClientError::Provider(message) => {
            assert_eq!(message, "API error (invalid_request_error): Incorrect API key provided")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn plain_error_body_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client(&server, ModelOptions::default())
        .complete(vec![Message::user("Hi")], None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server, ModelOptions::default())
        .complete(vec![Message::user("Hi")], None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Provider(_)));
}

#[tokio::test]
async fn query_round_trips_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"temperature": 0.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"CALL_TOOL: {"name": "shout", "arguments": {"text": "hi"}}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"temperature": 1.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("They said HI.")))
        .expect(1)
        .mount(&server)
        .await;

    let config = AiApiConfig::new("test-key")
        .with_base_url(server.uri())
        .with_temperatures(0.0, 1.0);
    let mut app = AiApi::new(config).unwrap();
    app.register(Tool::from_doc(
        "shout",
        "Upper-case some text.\n\nArgs:\n    text (str): Text to shout",
        vec![SignatureParam::typed("text", "String")],
        |args| to_output(args.get("text").and_then(|t| t.as_str()).unwrap_or_default().to_uppercase()),
    ))
    .unwrap();

    let answer = app.execute_query("Shout hi").await.unwrap();
    assert_eq!(answer, "They said HI.");
}

#[test]
fn missing_api_key_is_rejected() {
    assert!(matches!(
        AiApi::new(AiApiConfig::new("")),
        Err(ai_api::AiApiError::Transport(ClientError::Config(_)))
    ));
}
