mod common;

use std::io;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::routing::post;
use chat_relay::client::{CLIENT_ERROR_TEXT, ClientError, RelayClient};
use chat_relay::server::build_router;
use chat_relay::session::{Conversation, Sender};
use common::{HELLO_STREAM, test_config, test_state};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve the relay on an ephemeral port and return its base URL.
async fn spawn_relay(api_url: Option<String>) -> String {
    let app = build_router(test_state(test_config(api_url)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Serve a relay stand-in whose `/relay` body sends `first`, then breaks.
async fn spawn_broken_relay(first: &'static str) -> String {
    let app = Router::new().route(
        "/relay",
        post(move || async move {
            let body = async_stream::stream! {
                yield Ok::<_, io::Error>(Bytes::from_static(first.as_bytes()));
                tokio::time::sleep(Duration::from_millis(50)).await;
                yield Err(io::Error::from(io::ErrorKind::ConnectionReset));
            };
            Body::from_stream(body)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn upstream_with(body: &'static str) -> MockServer {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&upstream)
        .await;
    upstream
}

#[tokio::test]
async fn test_send_streams_reply_into_conversation() {
    let upstream = upstream_with(HELLO_STREAM).await;
    let relay = spawn_relay(Some(upstream.uri())).await;

    let client = RelayClient::new(relay);
    let conversation = Conversation::new("c1");
    let mut fragments = Vec::new();

    let reply = client
        .send(&conversation, "Say hello", |f| fragments.push(f.to_string()))
        .await
        .unwrap();

    assert_eq!(fragments, vec!["Hel", "lo"]);
    assert_eq!(reply.text, "Hello");
    assert!(!reply.is_streaming);

    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].text, "Say hello");
    assert_eq!(messages[1], reply);
}

#[tokio::test]
async fn test_send_skips_malformed_frames() {
    let upstream = upstream_with(concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: not-json\n\n",
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    ))
    .await;
    let relay = spawn_relay(Some(upstream.uri())).await;

    let conversation = Conversation::new("c2");
    let reply = RelayClient::new(relay)
        .send(&conversation, "hi", |_| {})
        .await
        .unwrap();

    assert_eq!(reply.text, "Hello");
    assert!(!reply.is_streaming);
}

#[tokio::test]
async fn test_stream_without_sentinel_stays_streaming() {
    let upstream =
        upstream_with("data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n").await;
    let relay = spawn_relay(Some(upstream.uri())).await;

    let conversation = Conversation::new("c3");
    let reply = RelayClient::new(relay)
        .send(&conversation, "hi", |_| {})
        .await
        .unwrap();

    assert_eq!(reply.text, "partial");
    assert!(reply.is_streaming);
}

#[tokio::test]
async fn test_relay_failure_appends_error_message() {
    let relay = spawn_relay(None).await;

    let conversation = Conversation::new("c4");
    let err = RelayClient::new(relay)
        .send(&conversation, "hi", |_| {})
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, reason } => {
            assert_eq!(status, 500);
            assert_eq!(reason, "Provider API URL not configured");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].sender, Sender::Ai);
    assert_eq!(messages[1].text, CLIENT_ERROR_TEXT);
    assert!(!messages[1].is_streaming);
}

#[tokio::test]
async fn test_empty_message_is_not_sent() {
    let conversation = Conversation::new("c5");
    // No relay is listening; an attempted request would fail differently.
    let err = RelayClient::new("http://127.0.0.1:1")
        .send(&conversation, " \n ", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::EmptyMessage));
    assert!(conversation.messages().is_empty());
}

#[tokio::test]
async fn test_interrupted_stream_keeps_partial_reply() {
    let relay =
        spawn_broken_relay("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n").await;

    let conversation = Conversation::new("c6");
    let mut fragments = Vec::new();
    let err = RelayClient::new(relay)
        .send(&conversation, "hi", |f| fragments.push(f.to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Interrupted(_)), "got {err:?}");
    assert_eq!(fragments, vec!["Hel"]);

    let messages = conversation.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].sender, Sender::Ai);
    assert_eq!(messages[1].text, "Hel");
    assert!(messages[1].is_streaming);
    assert_eq!(messages[2].sender, Sender::Ai);
    assert_eq!(messages[2].text, CLIENT_ERROR_TEXT);
    assert!(!messages[2].is_streaming);
}
