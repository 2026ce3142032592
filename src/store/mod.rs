//! Random-access retrieval of spans from the original source.

pub mod reader;

pub use reader::{read_span, SpanStore};
