use std::collections::VecDeque;

use crate::error::{Result, SpectraError};

/// Byte ring that hands out complete lines as transport chunks arrive.
///
/// Chunks may split a line (or a multi-byte character) anywhere; bytes stay
/// queued until their terminating `\n` shows up.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line, trimmed. `None` until a `\n` has been buffered.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(decode_line(&line_bytes))
    }

    /// Drain a trailing line that never received its newline
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let line_bytes: Vec<u8> = self.buffer.drain(..).collect();
        Some(decode_line(&line_bytes))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(|line| line.trim().to_string())
        .map_err(|e| SpectraError::InvalidStream(format!("Invalid UTF-8: {}", e)))
}
