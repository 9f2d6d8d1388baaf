//! Caller-side decoding of the provider's event framing.
//!
//! The relay forwards provider bytes untouched; this module turns those bytes
//! back into display text.
//!
//! - [`frame`]: pure classification of one line into a [`FrameLine`]
//! - [`decoder`]: rolling buffer that cuts arbitrary chunks into lines
//! - [`reply`]: applies decoded frames to the in-progress assistant message
//!
//! # Example
//!
//! ```rust
//! use chat_relay::stream::{FrameDecoder, ReplyAssembler};
//!
//! let mut decoder = FrameDecoder::new();
//! let mut reply = ReplyAssembler::new();
//! for chunk in [
//!     &b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"cho"[..],
//!     &b"ices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n"[..],
//! ] {
//!     for frame in decoder.feed(chunk) {
//!         reply.apply(&frame);
//!     }
//! }
//! assert_eq!(reply.text(), "Hello");
//! assert!(!reply.is_streaming());
//! ```

pub mod decoder;
pub mod frame;
pub mod reply;

pub use decoder::{FrameDecoder, LineBuffer};
pub use frame::{DATA_PREFIX, DONE_SENTINEL, Fragment, FrameLine, decode_line};
pub use reply::{ReplyAssembler, StreamPhase};
