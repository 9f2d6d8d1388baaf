//! Chat Completions API driver.
//!
//! Issues exactly one request per call. Nothing here retries.

use std::pin::Pin;

use axum::body::Bytes;
use futures::Stream;

use crate::config::{AppIdentity, ProviderSettings};
use crate::error::UpstreamError;

use super::{CompletionRequest, CompletionResponse, ErrorEnvelope};

/// Raw upstream response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Reply text used when the provider returns no content.
pub const EMPTY_REPLY_TEXT: &str = "No response received";

/// Driver for the Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: ProviderSettings,
    identity: AppIdentity,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .field("identity", &self.identity)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a driver sharing the given HTTP client.
    #[must_use]
    pub fn new(http: reqwest::Client, settings: ProviderSettings, identity: AppIdentity) -> Self {
        Self {
            http,
            settings,
            identity,
        }
    }

    /// Resolved provider settings.
    #[must_use]
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn request(&self, body: &CompletionRequest) -> reqwest::RequestBuilder {
        self.http
            .post(self.settings.completions_url())
            .bearer_auth(&self.settings.api_key)
            .header("HTTP-Referer", &self.identity.url)
            .header("X-Title", &self.identity.title)
            .json(body)
    }

    /// Open a streaming completion for one user message.
    ///
    /// Resolves once the provider has answered with a success status; the
    /// returned stream yields the raw response body chunks.
    pub async fn open_stream(
        &self,
        message: &str,
    ) -> Result<ByteStream, UpstreamError> {
        let body = CompletionRequest::streaming(
            self.settings.model.as_str(),
            message,
            self.settings.max_tokens,
        );

        let resp = self.request(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            // The body is dropped unread.
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                detail: None,
            });
        }

        tracing::debug!(
            name: "llm.stream.opened",
            model = %self.settings.model,
            status = status.as_u16(),
            "Upstream stream opened"
        );

        Ok(Box::pin(resp.bytes_stream()))
    }

    /// Run a non-streaming completion and return the reply text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        message: &str,
        temperature: f32,
    ) -> Result<String, UpstreamError> {
        let body = CompletionRequest::complete(
            self.settings.model.as_str(),
            system_prompt,
            message,
            self.settings.max_tokens,
            temperature,
        );

        let resp = self.request(&body).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .ok()
                .and_then(|e| e.error)
                .and_then(|e| e.message);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: CompletionResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed
            .first_text()
            .map_or_else(|| EMPTY_REPLY_TEXT.to_string(), ToString::to_string))
    }
}
