//! Error taxonomy for the relay and the chat endpoints.
//!
//! Each variant maps to exactly one HTTP status. Upstream details are logged,
//! never written into a response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Text returned for any upstream failure on the relay endpoint.
pub const UPSTREAM_FAILURE_TEXT: &str = "Internal server error";

/// Failure talking to the chat-completion provider.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The request never produced a response (DNS, connect, TLS, ...).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error(
        "provider returned status {status}{}",
        .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
    )]
    Status {
        /// HTTP status code.
        status: u16,
        /// Provider-supplied error message, if one could be read.
        detail: Option<String>,
    },

    /// The provider answered 2xx but the payload could not be decoded.
    #[error("malformed provider payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors surfaced by the relay and chat handlers.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Missing or invalid provider settings.
    #[error("{0}")]
    Configuration(String),

    /// Empty or missing user message.
    #[error("Message is required")]
    InvalidInput,

    /// Upstream unreachable or non-success.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Reading the upstream body failed after headers were sent downstream.
    /// Never rendered as a response; the relay ends the body instead.
    #[error("stream read failed: {0}")]
    StreamRead(String),
}

impl RelayError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Upstream(_) | Self::StreamRead(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short reason that is safe to show to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Configuration(reason) => reason.clone(),
            Self::InvalidInput => self.to_string(),
            Self::Upstream(_) | Self::StreamRead(_) => UPSTREAM_FAILURE_TEXT.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let Self::Upstream(err) = &self {
            tracing::error!(name: "relay.upstream.failed", error = %err, "Upstream request failed");
        }
        (self.status(), self.public_message()).into_response()
    }
}
