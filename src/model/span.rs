//! Byte-offset coordinates into the caller's stream.

use std::fmt;

/// An immutable `(start, length)` byte range within the original stream.
///
/// A span owns no bytes. Recover its content by seeking the same source to
/// `start` and reading `length` bytes (see [`crate::store::reader`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct MessageSpan {
    /// Offset of the first byte.
    pub start: u64,
    /// Number of bytes covered.
    pub length: u64,
}

impl MessageSpan {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Span covering the half-open range `[start, end)`.
    ///
    /// An `end` before `start` yields an empty span at `start`.
    pub fn between(start: u64, end: u64) -> Self {
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    /// Zero-length span positioned at `offset`.
    pub fn empty_at(offset: u64) -> Self {
        Self {
            start: offset,
            length: 0,
        }
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: &MessageSpan) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }
}

impl fmt::Display for MessageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
