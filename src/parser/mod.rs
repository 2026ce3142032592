//! Structural scanning: lines, header blocks, multipart boundaries, and the
//! single-pass parser that ties them together.

pub mod boundary;
pub mod cancel;
pub mod content_type;
pub mod header;
pub mod line;
pub mod structure;

pub use cancel::{CancelHandle, Cancellation};
pub use content_type::{ContentKind, HeaderSemantics, MailParserSemantics};
pub use structure::{parse_structure, StructureParser};
