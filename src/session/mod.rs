//! Conversation storage.
//!
//! In-memory conversations keyed by session id. Each [`Conversation`] owns
//! its ordered list of [`ChatMessage`]s; nothing is shared between sessions
//! and nothing is persisted.
//!
//! # Example
//!
//! ```rust
//! use chat_relay::session::{Sender, SessionStore};
//!
//! let store = SessionStore::new();
//! let conversation = store.create();
//! conversation.append(Sender::User, "Hello!", false);
//! assert_eq!(conversation.messages().len(), 1);
//!
//! conversation.clear();
//! conversation.clear();
//! assert!(conversation.messages().is_empty());
//! ```

mod thread;

pub use thread::{ChatMessage, Conversation, Sender, SessionStore};
