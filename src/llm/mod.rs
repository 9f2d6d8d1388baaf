//! Chat-completion provider wire types and driver.
//!
//! The provider speaks the `OpenAI` Chat Completions protocol
//! (`POST {base}/chat/completions`). Two request shapes are used:
//!
//! - streaming: a single user message, `stream: true`, relayed byte for byte
//! - non-streaming: system prompt plus user message, decoded into a reply
//!
//! # Example
//!
//! ```rust
//! use chat_relay::llm::CompletionRequest;
//!
//! let req = CompletionRequest::streaming("gpt-4o-mini", "Hello", 1000);
//! let body = serde_json::to_value(&req).unwrap();
//! assert_eq!(body["stream"], true);
//! assert_eq!(body["messages"][0]["role"], "user");
//! ```

pub mod chat_completions;

pub use chat_completions::{ByteStream, ChatCompletionsDriver};

use serde::{Deserialize, Serialize};

/// Role of a message author, as the provider names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in an upstream request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
}

impl WireMessage {
    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<WireMessage>,
    /// Whether the provider should stream event frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A streaming request carrying one user message.
    #[must_use]
    pub fn streaming(model: impl Into<String>, message: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: vec![WireMessage::user(message)],
            stream: Some(true),
            max_tokens,
            temperature: None,
        }
    }

    /// A non-streaming request with a system prompt ahead of the user message.
    #[must_use]
    pub fn complete(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        message: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![WireMessage::system(system_prompt), WireMessage::user(message)],
            stream: None,
            max_tokens,
            temperature: Some(temperature),
        }
    }
}

/// Non-streaming response body. Only the fields the relay reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    /// Generated choices.
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

/// One choice in a non-streaming response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChoice {
    /// The assistant message.
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

/// Assistant message inside a choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    /// Message text; providers send `null` for tool-only turns.
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()?
            .message
            .as_ref()?
            .content
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}

/// Provider error envelope: `{ "error": { "message": ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
