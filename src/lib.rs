//! `mimescan`: single-pass structural scanner for RFC 5322 / MIME messages.
//!
//! Reads a message from an asynchronous byte source exactly once and returns
//! a tree of byte spans: for every entity, where its header block is and
//! where its content is, with multipart bodies split into their parts. No
//! message bytes are copied into the tree and nothing is decoded; spans are
//! read back from the original source on demand.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod store;

pub use error::{Result, ScanError};
pub use model::{Diagnostic, MessageSpan, MessageStructure, ParseReport};
pub use parser::{parse_structure, CancelHandle, Cancellation, StructureParser};
