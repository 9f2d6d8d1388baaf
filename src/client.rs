//! Caller side of the relay.
//!
//! [`RelayClient::send`] posts one message to `/relay` and folds the relayed
//! event stream into a [`Conversation`], reporting each fragment as it
//! arrives.

use futures::StreamExt;
use serde_json::json;
use thiserror::Error;

use crate::session::{ChatMessage, Conversation, Sender};
use crate::stream::{FrameDecoder, FrameLine, ReplyAssembler};

/// Text appended to the conversation when no reply stream could be opened.
pub const CLIENT_ERROR_TEXT: &str = "Error: Failed to get response from AI";

/// Relay client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Empty or whitespace-only message; nothing was sent.
    #[error("message is empty")]
    EmptyMessage,

    /// The request could not be sent.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The relay answered with a non-success status.
    #[error("relay returned status {status}: {reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Short reason from the relay body.
        reason: String,
    },

    /// The connection broke while the reply was streaming.
    #[error("stream interrupted: {0}")]
    Interrupted(reqwest::Error),
}

/// HTTP client for a running relay.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// Create a client for the relay at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Create a client sharing an existing HTTP client.
    #[must_use]
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Send one message and stream the reply into `conversation`.
    ///
    /// The user message and an empty, streaming AI message are appended
    /// first; fragments are appended to the AI message as they decode and
    /// passed to `on_fragment`. Returns the final AI message.
    ///
    /// If the stream breaks after it started, the AI message keeps its
    /// partial text and stays flagged as streaming.
    pub async fn send<F>(
        &self,
        conversation: &Conversation,
        message: &str,
        mut on_fragment: F,
    ) -> Result<ChatMessage, ClientError>
    where
        F: FnMut(&str),
    {
        if message.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        conversation.append(Sender::User, message, false);

        let resp = match self.open(message).await {
            Ok(resp) => resp,
            Err(e) => {
                conversation.append(Sender::Ai, CLIENT_ERROR_TEXT, false);
                return Err(e);
            }
        };

        let reply_msg = conversation.append(Sender::Ai, "", true);
        let mut decoder = FrameDecoder::new();
        let mut reply = ReplyAssembler::new();
        reply.start();

        let mut body = std::pin::pin!(resp.bytes_stream());
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    reply.fail();
                    conversation.append(Sender::Ai, CLIENT_ERROR_TEXT, false);
                    return Err(ClientError::Interrupted(e));
                }
            };

            for frame in decoder.feed(&chunk) {
                match reply.apply(&frame) {
                    Some(fragment) => {
                        conversation.update(&reply_msg.id, |m| m.text.push_str(fragment));
                        on_fragment(fragment);
                    }
                    None if frame == FrameLine::Sentinel => {
                        conversation.update(&reply_msg.id, |m| m.is_streaming = false);
                    }
                    None => {
                        if frame == FrameLine::Unparsable {
                            tracing::debug!(name: "client.frame.skipped", "Skipped unparsable frame");
                        }
                    }
                }
            }
        }

        Ok(conversation.update(&reply_msg.id, |_| {}).unwrap_or_else(|| {
            // Conversation was cleared mid-stream; report what was assembled.
            ChatMessage {
                text: reply.text().to_string(),
                is_streaming: reply.is_streaming(),
                ..reply_msg
            }
        }))
    }

    async fn open(&self, message: &str) -> Result<reqwest::Response, ClientError> {
        let resp = self
            .http
            .post(format!("{}/relay", self.base_url))
            .json(&json!({ "message": message }))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let reason = resp.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            reason,
        })
    }
}
