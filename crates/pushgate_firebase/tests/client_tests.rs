use pushgate_config::FirebaseConfig;
use pushgate_firebase::auth::StaticTokenSource;
use pushgate_firebase::{
    ErrorCode, FirebaseClient, Priority, ProviderError, PushProvider, SendOptions,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEND_PATH: &str = "/v1/projects/demo-project/messages:send";

fn client_for(server: &MockServer) -> FirebaseClient {
    let config = FirebaseConfig {
        project_id: Some("demo-project".to_string()),
        api_base_url: format!("{}/", server.uri()),
        request_timeout_secs: 5,
        ..FirebaseConfig::default()
    };
    FirebaseClient::with_token_source(config, Arc::new(StaticTokenSource("test-token".into())))
        .unwrap()
}

fn data() -> HashMap<String, String> {
    HashMap::from([
        ("type".to_string(), "chat".to_string()),
        ("count".to_string(), "3".to_string()),
    ])
}

fn unregistered_body() -> Value {
    json!({
        "error": {
            "code": 404,
            "message": "Requested entity was not found.",
            "status": "NOT_FOUND",
            "details": [{
                "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                "errorCode": "UNREGISTERED"
            }]
        }
    })
}

fn invalid_token_body() -> Value {
    json!({
        "error": {
            "code": 400,
            "message": "The registration token is not a valid FCM registration token",
            "status": "INVALID_ARGUMENT"
        }
    })
}

#[tokio::test]
async fn test_send_single_returns_message_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "name": "projects/demo-project/messages/42" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let message_id = client
        .send_single("alpha-token", &data(), &SendOptions::default())
        .await
        .unwrap();

    assert_eq!(message_id, "projects/demo-project/messages/42");
}

#[tokio::test]
async fn test_request_body_is_data_only_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": "projects/demo-project/messages/1" })),
        )
        .mount(&server)
        .await;

    let options = SendOptions {
        priority: Priority::Normal,
        ttl_seconds: Some(120),
        collapse_key: Some("chat-42".to_string()),
    };
    client_for(&server)
        .send_single("alpha-token", &data(), &options)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = &body["message"];

    assert_eq!(message["token"], "alpha-token");
    assert_eq!(message["data"], json!({ "type": "chat", "count": "3" }));
    assert!(message.get("notification").is_none());
    assert_eq!(message["android"]["priority"], "NORMAL");
    assert_eq!(message["android"]["ttl"], "120s");
    assert_eq!(message["android"]["collapse_key"], "chat-42");
    assert_eq!(message["apns"]["headers"]["apns-collapse-id"], "chat-42");
}

#[tokio::test]
async fn test_send_single_classifies_unregistered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(unregistered_body()))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .send_single("gone-token", &data(), &SendOptions::default())
        .await;

    match result {
        Err(ProviderError::ApiError { status, code, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(code, ErrorCode::Unregistered);
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_single_unavailable_without_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .send_single("alpha-token", &data(), &SendOptions::default())
        .await;

    assert!(matches!(
        result,
        Err(ProviderError::ApiError { code: ErrorCode::Unavailable, .. })
    ));
}

#[tokio::test]
async fn test_multicast_outcomes_align_with_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_string_contains("\"token\":\"gone-token\""))
        .respond_with(ResponseTemplate::new(404).set_body_json(unregistered_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_string_contains("\"token\":\"broken-token\""))
        .respond_with(ResponseTemplate::new(400).set_body_json(invalid_token_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_string_contains("\"token\":\"alpha-token\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": "projects/demo-project/messages/7" })),
        )
        .mount(&server)
        .await;

    let tokens = vec![
        "gone-token".to_string(),
        "alpha-token".to_string(),
        "broken-token".to_string(),
    ];
    let outcomes = client_for(&server)
        .send_multicast(&tokens, &data(), &SendOptions::default())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);

    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].error_code, Some(ErrorCode::Unregistered));
    assert!(outcomes[0].is_token_invalid());

    assert!(outcomes[1].success);
    assert_eq!(
        outcomes[1].message_id.as_deref(),
        Some("projects/demo-project/messages/7")
    );

    assert!(!outcomes[2].success);
    assert_eq!(outcomes[2].error_code, Some(ErrorCode::InvalidRegistrationToken));
    assert!(outcomes[2].is_token_invalid());
}

#[tokio::test]
async fn test_missing_project_id_fails_before_any_request() {
    let server = MockServer::start().await;
    let config = FirebaseConfig {
        api_base_url: server.uri(),
        ..FirebaseConfig::default()
    };
    let client = FirebaseClient::with_token_source(
        config,
        Arc::new(StaticTokenSource("test-token".into())),
    )
    .unwrap();

    let result = client
        .send_multicast(&["alpha-token".to_string()], &data(), &SendOptions::default())
        .await;

    assert!(matches!(result, Err(ProviderError::ConfigError(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}
