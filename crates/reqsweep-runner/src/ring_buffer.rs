//! Bounded capture of a child's output stream
//!
//! The tool's stdout is diagnostic only (the artifact on disk is the result),
//! so only the most recent bytes are kept and anything older is discarded.

use std::collections::VecDeque;
use std::fmt;

/// Keeps the last `max_bytes` bytes written to it.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: VecDeque<u8>,
    max_bytes: usize,
    total_bytes_written: usize,
}

impl RingBuffer {
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(max_bytes.min(8192)),
            max_bytes,
            total_bytes_written: 0,
        }
    }

    /// Append a chunk, evicting the oldest bytes past capacity.
    pub fn write(&mut self, data: &[u8]) {
        self.total_bytes_written += data.len();
        if self.max_bytes == 0 {
            return;
        }

        let keep = &data[data.len().saturating_sub(self.max_bytes)..];
        let overflow = (self.buffer.len() + keep.len()).saturating_sub(self.max_bytes);
        self.buffer.drain(..overflow);
        self.buffer.extend(keep);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bytes ever written, including evicted ones.
    #[must_use]
    pub const fn total_bytes_written(&self) -> usize {
        self.total_bytes_written
    }

    #[must_use]
    pub const fn was_truncated(&self) -> bool {
        self.total_bytes_written > self.max_bytes
    }

    /// Lossy UTF-8 view of the retained bytes.
    #[must_use]
    pub fn contents(&self) -> String {
        let (front, back) = self.buffer.as_slices();
        if back.is_empty() {
            return String::from_utf8_lossy(front).into_owned();
        }
        let joined: Vec<u8> = self.buffer.iter().copied().collect();
        String::from_utf8_lossy(&joined).into_owned()
    }
}

impl fmt::Display for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.contents())
    }
}
