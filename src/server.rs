use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use tower_http::trace::TraceLayer;

use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::config::{AppConfig, ProviderSettings};
use crate::error::RelayError;
use crate::llm::ChatCompletionsDriver;
use crate::relay::relay_body;
use crate::session::{ChatMessage, Sender, SessionStore};

/// Text appended to a conversation when the upstream call fails.
pub const APOLOGY_TEXT: &str = "I apologize, but I encountered an error. Please try again.";

/// Error text of the non-streaming chat endpoint for upstream failures.
pub const CHAT_FAILURE_TEXT: &str = "Failed to process chat request";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    match config.provider.resolve() {
        Ok(settings) => info!(
            name: "llm.config.loaded",
            base_url = %settings.api_url,
            model = %settings.model,
            "Provider configuration loaded"
        ),
        Err(e) => tracing::warn!(
            name: "llm.config.incomplete",
            reason = %e,
            "Provider configuration incomplete; chat requests will fail until it is set"
        ),
    }

    let state = AppState::new(Arc::clone(&config));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/relay", post(relay_handler))
        .route("/api/chat", post(api_chat))
        .route("/api/sessions", post(api_create_session))
        .route("/api/sessions/{id}", delete(api_delete_session))
        .route(
            "/api/sessions/{id}/messages",
            post(api_send_message)
                .get(api_get_messages)
                .delete(api_clear_messages),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn provider_driver(state: &AppState, settings: ProviderSettings) -> ChatCompletionsDriver {
    ChatCompletionsDriver::new(state.http.clone(), settings, state.config.app.clone())
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming relay
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the relay and chat endpoints.
#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    /// User message content; missing is treated as empty.
    #[serde(default)]
    pub message: String,
}

/// POST /relay - Stream one reply, relaying provider bytes unchanged.
async fn relay_handler(
    State(state): State<AppState>,
    body: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    let Json(req) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected relay body");
        RelayError::InvalidInput
    })?;

    if req.message.trim().is_empty() {
        return Err(RelayError::InvalidInput);
    }

    let driver = provider_driver(&state, state.config.provider.resolve()?);
    let relay_id = Uuid::new_v4().to_string();

    info!(
        name: "relay.started",
        relay_id = %relay_id,
        model = %driver.settings().model,
        message_len = req.message.len(),
        "Relaying chat stream"
    );

    let upstream = driver.open_stream(&req.message).await?;
    let body = Body::from_stream(relay_body(upstream, relay_id));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        body,
    )
        .into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Non-streaming chat
// ─────────────────────────────────────────────────────────────────────────────

/// Response from the chat API.
#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// POST /api/chat - One request, one reply.
///
/// Unlike the relay, the message is only required to be a string; it is not
/// trimmed.
async fn api_chat(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let message = match body.as_ref().ok().and_then(|Json(v)| v.get("message")) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return json_error(StatusCode::BAD_REQUEST, "Message is required"),
    };

    let driver = match state.config.provider.resolve_for_chat() {
        Ok(settings) => provider_driver(&state, settings),
        Err(e) => return json_error(e.status(), &e.public_message()),
    };

    match driver
        .complete(
            &state.config.chat.system_prompt,
            &message,
            state.config.chat.temperature,
        )
        .await
    {
        Ok(response) => Json(ChatResponse { response }).into_response(),
        Err(e) => {
            tracing::error!(name: "chat.upstream.failed", error = %e, "Chat API error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILURE_TEXT)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
}

/// POST /api/sessions - Start an empty conversation.
async fn api_create_session(State(state): State<AppState>) -> impl IntoResponse {
    let conversation = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: conversation.id().to_string(),
        }),
    )
}

/// GET /api/sessions/:id/messages - List a conversation.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, StatusCode> {
    state
        .sessions
        .get(&id)
        .map(|c| Json(c.messages()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// POST /api/sessions/:id/messages - Send a message and store the reply.
///
/// Upstream and configuration failures never surface as errors here: the
/// apology text is stored as the reply instead. Unknown ids are 404; only
/// `POST /api/sessions` creates conversations.
async fn api_send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<Vec<ChatMessage>>, Response> {
    let Some(conversation) = state.sessions.get(&id) else {
        return Err(StatusCode::NOT_FOUND.into_response());
    };
    let Json(req) = body.map_err(|_rejection| RelayError::InvalidInput.into_response())?;

    if req.message.trim().is_empty() {
        return Ok(Json(conversation.messages()));
    }

    conversation.append(Sender::User, req.message.as_str(), false);

    let reply = match state.config.provider.resolve_for_chat() {
        Ok(settings) => provider_driver(&state, settings)
            .complete(
                &state.config.chat.system_prompt,
                &req.message,
                state.config.chat.temperature,
            )
            .await
            .map_err(RelayError::from),
        Err(e) => Err(e),
    };

    let text = reply.unwrap_or_else(|e| {
        tracing::error!(
            name: "chat.upstream.failed",
            session_id = %id,
            error = %e,
            "Substituting apology for failed reply"
        );
        APOLOGY_TEXT.to_string()
    });
    conversation.append(Sender::Ai, text, false);

    Ok(Json(conversation.messages()))
}

/// DELETE /api/sessions/:id/messages - Clear a conversation. Idempotent.
async fn api_clear_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    if let Some(conversation) = state.sessions.get(&id) {
        conversation.clear();
    }
    StatusCode::NO_CONTENT
}

/// DELETE /api/sessions/:id - Drop a conversation.
async fn api_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    match state.sessions.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

impl AppState {
    /// Fresh state with an empty session store.
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            sessions: SessionStore::new(),
        }
    }
}
