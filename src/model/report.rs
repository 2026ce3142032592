//! Scan outcome: the structure tree plus non-fatal diagnostics.

use std::fmt;

use super::structure::MessageStructure;

/// A framing anomaly that did not stop the scan.
///
/// The tree is still returned, but the affected node is a best-effort
/// reading of the input.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A multipart body ended without its terminal delimiter.
    /// `offset` is where the multipart's content starts.
    TruncatedMultipart { offset: u64, boundary: String },

    /// The header claims multipart but has no usable boundary parameter;
    /// the entity was treated as a leaf.
    MissingBoundary { offset: u64 },

    /// Multipart nesting deeper than the configured limit; the entity at
    /// `offset` was treated as a leaf.
    DepthLimit { offset: u64, depth: usize },

    /// The header block starting at `offset` is larger than the buffered
    /// maximum. Its span is exact, but only the first `limit` bytes were
    /// inspected for the content type.
    HeaderTooLarge { offset: u64, limit: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::TruncatedMultipart { offset, boundary } => write!(
                f,
                "multipart at offset {offset} has no terminal delimiter for boundary \"{boundary}\""
            ),
            Diagnostic::MissingBoundary { offset } => {
                write!(f, "multipart at offset {offset} has no boundary parameter")
            }
            Diagnostic::DepthLimit { offset, depth } => {
                write!(f, "entity at offset {offset} exceeds nesting depth {depth}")
            }
            Diagnostic::HeaderTooLarge { offset, limit } => {
                write!(f, "header at offset {offset} exceeds {limit} bytes")
            }
        }
    }
}

/// Result of a successful structural parse.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParseReport {
    /// Root of the structure tree. Its header span starts at offset 0.
    pub structure: MessageStructure,

    /// Anomalies in stream order.
    pub diagnostics: Vec<Diagnostic>,

    /// Total number of bytes read from the source.
    pub stream_length: u64,
}

impl ParseReport {
    /// Whether any multipart body ended without its terminal delimiter.
    pub fn is_truncated(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::TruncatedMultipart { .. }))
    }

    /// Whether the tree is an exact reading of well-formed input.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
