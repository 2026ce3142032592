//! Centralized error types for mimescan.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::span::MessageSpan;

/// All fatal outcomes of a scan or a span retrieval.
///
/// Non-fatal framing anomalies are not errors; they travel as
/// [`crate::model::Diagnostic`] values next to a best-effort tree.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Reading the byte source failed at the given stream offset.
    #[error("I/O error at offset {offset}: {source}")]
    Io {
        offset: u64,
        source: std::io::Error,
    },

    /// Opening or seeking a file-backed source failed.
    #[error("I/O error on '{path}': {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A line exceeded the configured maximum length.
    #[error("Line at offset {offset} exceeds the maximum length of {limit} bytes")]
    LineTooLong { offset: u64, limit: usize },

    /// Cancellation was observed before the next read.
    #[error("Scan cancelled at offset {offset}")]
    Cancelled { offset: u64 },

    /// The source ended before the requested span did.
    #[error("Span {span} lies outside the source")]
    SpanOutOfRange { span: MessageSpan },

    /// A part path did not resolve to a node of the tree.
    #[error("No part at path '{0}'")]
    PartNotFound(String),
}

/// Convenience alias for `Result<T, ScanError>`.
pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    /// Create an `Io` variant tagged with the offset of the failed read.
    pub fn io(offset: u64, source: std::io::Error) -> Self {
        Self::Io { offset, source }
    }

    /// Create a `File` variant from a path and an `io::Error`.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Stream offset the error refers to, when it has one.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Io { offset, .. }
            | Self::LineTooLong { offset, .. }
            | Self::Cancelled { offset } => Some(*offset),
            Self::SpanOutOfRange { span } => Some(span.start),
            Self::File { .. } | Self::PartNotFound(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
