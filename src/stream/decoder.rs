//! Rolling line buffer over arbitrarily split byte chunks.

use super::frame::{FrameLine, decode_line};

/// Accumulates bytes and hands out complete `\n`-terminated lines.
///
/// Lines are cut on raw bytes, so a multi-byte UTF-8 character split across
/// two chunks is whole again before it is decoded.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// The incomplete trailing line, if any.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

/// Turns byte chunks into classified frame lines.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    lines: LineBuffer,
}

impl FrameDecoder {
    /// Create a decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the frames completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<FrameLine> {
        self.lines
            .push(chunk)
            .iter()
            .map(|line| decode_line(line))
            .collect()
    }

    /// Bytes still waiting for a line terminator.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        self.lines.pending()
    }
}
