//! Conversation thread and session storage.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// One message as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Creation time in epoch milliseconds, bumped to stay unique.
    pub id: String,
    pub sender: Sender,
    /// Grows while streaming; fixed afterwards.
    pub text: String,
    /// RFC 3339.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_streaming: bool,
}

#[derive(Debug, Default)]
struct MessageLog {
    messages: Vec<ChatMessage>,
    /// Last id handed out, so ids stay strictly increasing across clears.
    last_stamp: i64,
}

impl MessageLog {
    fn next_stamp(&mut self, now: DateTime<Utc>) -> i64 {
        let stamp = now.timestamp_millis().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        stamp
    }
}

/// A single conversation.
///
/// Cheap to clone; clones share the same message list.
#[derive(Debug, Clone)]
pub struct Conversation {
    inner: Arc<ConversationInner>,
}

#[derive(Debug)]
struct ConversationInner {
    id: String,
    log: RwLock<MessageLog>,
    created_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

impl Conversation {
    /// Create an empty conversation with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ConversationInner {
                id: id.into(),
                log: RwLock::new(MessageLog::default()),
                created_at: Utc::now(),
            }),
        }
    }

    /// Conversation id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// When the conversation was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Append a message and return a copy of it.
    pub fn append(&self, sender: Sender, text: impl Into<String>, is_streaming: bool) -> ChatMessage {
        let mut log = self.inner.log.write().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let message = ChatMessage {
            id: log.next_stamp(now).to_string(),
            sender,
            text: text.into(),
            timestamp: now,
            is_streaming,
        };
        log.messages.push(message.clone());
        message
    }

    /// Mutate a message in place. Returns the updated copy, or `None` if the
    /// id is gone (for instance after a clear).
    pub fn update(&self, id: &str, f: impl FnOnce(&mut ChatMessage)) -> Option<ChatMessage> {
        let mut log = self.inner.log.write().unwrap_or_else(PoisonError::into_inner);
        let message = log.messages.iter_mut().find(|m| m.id == id)?;
        f(message);
        Some(message.clone())
    }

    /// Snapshot of all messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner
            .log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .messages
            .clone()
    }

    /// Number of messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner
            .log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .messages
            .len()
    }

    /// Remove all messages. Clearing an empty conversation is a no-op.
    pub fn clear(&self) {
        self.inner
            .log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .messages
            .clear();
    }
}

/// Thread-safe store for conversations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Conversation>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create a new conversation and return it.
    #[must_use]
    pub fn create(&self) -> Conversation {
        self.create_with_id(Uuid::new_v4().to_string())
    }

    /// Create a new conversation with a specific id, replacing any existing one.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> Conversation {
        let conversation = Conversation::new(id);
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(conversation.id().to_string(), conversation.clone());
        conversation
    }

    /// Get a conversation by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Conversation> {
        let guard = self
            .inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(id).cloned()
    }

    /// Remove a conversation by id.
    pub fn remove(&self, id: &str) -> Option<Conversation> {
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.remove(id)
    }

    /// Number of stored conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if there are no conversations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
