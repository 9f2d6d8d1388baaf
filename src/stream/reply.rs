//! Assembly of the assistant reply from decoded frames.

use super::frame::FrameLine;

/// Lifecycle of one streamed reply.
///
/// `NotStarted → Streaming → Done | Errored`. Nothing leaves `Errored`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamPhase {
    #[default]
    NotStarted,
    Streaming,
    Done,
    Errored,
}

/// Accumulates fragments into the reply text.
#[derive(Debug, Default)]
pub struct ReplyAssembler {
    text: String,
    phase: StreamPhase,
    streaming: bool,
}

impl ReplyAssembler {
    /// Create an assembler in the `NotStarted` phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the response as open.
    pub fn start(&mut self) {
        if self.phase == StreamPhase::NotStarted {
            self.phase = StreamPhase::Streaming;
            self.streaming = true;
        }
    }

    /// Apply one frame. Returns the fragment appended, if any.
    ///
    /// The sentinel ends streaming but does not stop decoding: fragments that
    /// still arrive afterwards are appended. Frames are ignored once errored.
    pub fn apply<'a>(&mut self, frame: &'a FrameLine) -> Option<&'a str> {
        if self.phase == StreamPhase::Errored {
            return None;
        }
        self.start();

        match frame {
            FrameLine::Sentinel => {
                self.phase = StreamPhase::Done;
                self.streaming = false;
                None
            }
            FrameLine::DataFrame(fragment) if !fragment.is_empty() => {
                self.text.push_str(fragment.as_str());
                Some(fragment.as_str())
            }
            FrameLine::DataFrame(_) | FrameLine::Unparsable | FrameLine::Ignored => None,
        }
    }

    /// Record a failure; terminal.
    pub fn fail(&mut self) {
        self.phase = StreamPhase::Errored;
    }

    /// Text assembled so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Whether the reply is still flagged as streaming.
    ///
    /// Only the sentinel clears the flag; a broken connection leaves it set.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}
