//! Data model: byte spans, the structure tree, and the parse report.

pub mod report;
pub mod span;
pub mod structure;

pub use report::{Diagnostic, ParseReport};
pub use span::MessageSpan;
pub use structure::MessageStructure;
