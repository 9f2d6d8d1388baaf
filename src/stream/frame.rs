//! Tagged decoding of a single event line.

use serde_json::Value;

/// Prefix of every data line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental piece of assistant text carried by one frame.
///
/// Empty when the frame parsed but carried no `choices[0].delta.content`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    /// Extract the fragment from a parsed frame payload.
    ///
    /// Any shape mismatch yields an empty fragment.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let text = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        Self(text.to_string())
    }

    /// Fragment text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the fragment carries no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Fragment {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One line of the event stream, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLine {
    /// `data: [DONE]`.
    Sentinel,
    /// `data: <json>` with its fragment (possibly empty).
    DataFrame(Fragment),
    /// `data: ` followed by something that is not JSON.
    Unparsable,
    /// Anything without the `data: ` prefix: blank separators, comments,
    /// `event:` or `id:` fields.
    Ignored,
}

/// Classify one line, without its terminating newline.
///
/// A trailing `\r` is dropped so CRLF-framed streams decode the same way.
#[must_use]
pub fn decode_line(line: &str) -> FrameLine {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return FrameLine::Ignored;
    };

    if payload == DONE_SENTINEL {
        return FrameLine::Sentinel;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => FrameLine::DataFrame(Fragment::from_payload(&value)),
        Err(_) => FrameLine::Unparsable,
    }
}
