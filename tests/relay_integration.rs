mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use chat_relay::server::build_router;
use chat_relay::stream::{FrameDecoder, ReplyAssembler};
use common::{API_KEY, HELLO_STREAM, MODEL, test_config, test_state};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server_for(upstream: &MockServer) -> TestServer {
    let state = test_state(test_config(Some(upstream.uri())));
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn test_relay_forwards_stream_unchanged() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .and(header("x-title", "test-relay"))
        .and(body_partial_json(json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "Say hello"}],
            "stream": true,
            "max_tokens": 1000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HELLO_STREAM, "text/event-stream"))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = server_for(&upstream);
    let response = server
        .post("/relay")
        .json(&json!({ "message": "Say hello" }))
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.header("cache-control").to_str().unwrap(), "no-cache");

    let body = response.as_bytes().to_vec();
    assert_eq!(body, HELLO_STREAM.as_bytes());

    let mut decoder = FrameDecoder::new();
    let mut reply = ReplyAssembler::new();
    for frame in decoder.feed(&body) {
        reply.apply(&frame);
    }
    assert_eq!(reply.text(), "Hello");
    assert!(!reply.is_streaming());
}

#[tokio::test]
async fn test_empty_message_makes_no_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let server = server_for(&upstream);

    for body in [json!({ "message": "" }), json!({ "message": "  \n\t " }), json!({})] {
        let response = server.post("/relay").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Message is required");
    }
}

#[tokio::test]
async fn test_malformed_body_is_invalid_input() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let server = server_for(&upstream);
    let response = server.post("/relay").text("not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_error_status_forwards_nothing() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "invalid key sk-leak" } })),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let server = server_for(&upstream);
    let response = server
        .post("/relay")
        .json(&json!({ "message": "hi" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let text = response.text();
    assert_eq!(text, "Internal server error");
    assert!(!text.contains("data:"));
    assert!(!text.contains("sk-leak"));
}

#[tokio::test]
async fn test_unreachable_upstream() {
    // Nothing listens on port 1.
    let state = test_state(test_config(Some("http://127.0.0.1:1".to_string())));
    let server = TestServer::new(build_router(state)).unwrap();

    let response = server
        .post("/relay")
        .json(&json!({ "message": "hi" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Internal server error");
}

#[tokio::test]
async fn test_missing_configuration() {
    let mut config = test_config(None);
    let server = TestServer::new(build_router(test_state(config.clone()))).unwrap();
    let response = server
        .post("/relay")
        .json(&json!({ "message": "hi" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Provider API URL not configured");

    config.provider.api_key = None;
    let server = TestServer::new(build_router(test_state(config))).unwrap();
    let response = server
        .post("/relay")
        .json(&json!({ "message": "hi" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Provider API key not configured");
}

#[tokio::test]
async fn test_invalid_input_checked_before_configuration() {
    let mut config = test_config(None);
    config.provider.api_key = None;
    let server = TestServer::new(build_router(test_state(config))).unwrap();

    let response = server.post("/relay").json(&json!({ "message": " " })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
