//! Splitting the incoming byte stream into frames.
//!
//! Every frame ends with `FF FF FF`, but `0xFF` may also appear inside a
//! number payload, so the terminator alone cannot delimit frames. The buffer
//! uses the fixed length of each frame kind where one exists and only falls
//! back to scanning for the terminator for string frames.
//!
//! ```text
//! 71 FF FF FF FF FF FF FF | 01 FF FF FF
//! \__ number (8 bytes) __/   \_ success
//! ```

use bytes::{Buf, BytesMut};
use log::warn;

use crate::constants::*;

/// Maximum number of bytes buffered without finding a frame.
///
/// Matches the panel's own serial buffer size.
pub const MAX_BUFFERED: usize = 1024;

/// Accumulates raw serial bytes and yields complete frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        FrameBuffer {
            buffer: BytesMut::with_capacity(MAX_BUFFERED),
        }
    }

    /// Add received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_BUFFERED && self.find_terminator().is_none() {
            warn!(
                "discarding {} buffered bytes without a frame terminator",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Take the next complete frame, or `None` if more data is needed.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let code = *self.buffer.first()?;

        let len = if code == CODE_INVALID_INSTRUCTION {
            // Either a 4-byte fault or the 6-byte startup sentinel.
            let second = *self.buffer.get(1)?;
            if second == 0x00 {
                STARTUP_SENTINEL.len()
            } else {
                STATUS_LEN
            }
        } else if let Some(len) = fixed_frame_len(code) {
            len
        } else {
            self.find_terminator()? + TERMINATOR.len()
        };

        if self.buffer.len() < len {
            return None;
        }

        if !self.buffer[..len].ends_with(&TERMINATOR) {
            // Shape does not match its code; hand the caller whatever precedes
            // the next terminator so the parser reports it.
            let end = self.find_terminator()? + TERMINATOR.len();
            warn!(
                "frame with code 0x{:02X} does not have its fixed length, resynchronizing",
                code
            );
            return Some(self.take(end));
        }

        Some(self.take(len))
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn take(&mut self, len: usize) -> Vec<u8> {
        let frame = self.buffer[..len].to_vec();
        self.buffer.advance(len);
        frame
    }

    fn find_terminator(&self) -> Option<usize> {
        self.buffer
            .windows(TERMINATOR.len())
            .position(|window| window == TERMINATOR)
    }
}
