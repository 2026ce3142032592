//! Content-type inspection: does a header block declare a multipart body?
//!
//! This is the only place header fields are interpreted. The scanner asks
//! once per entity and otherwise treats header bytes as opaque.

use mail_parser::{MessageParser, MimeHeaders};

/// What a header block says about the body that follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Anything that is not multipart.
    Single,
    /// `multipart/*`, with the boundary parameter if one was present and non-empty.
    Multipart { boundary: Option<String> },
}

impl ContentKind {
    pub fn is_multipart(&self) -> bool {
        matches!(self, ContentKind::Multipart { .. })
    }

    /// `(is_multipart, boundary)` pair.
    pub fn into_parts(self) -> (bool, Option<String>) {
        match self {
            ContentKind::Single => (false, None),
            ContentKind::Multipart { boundary } => (true, boundary),
        }
    }
}

/// Header-semantics collaborator consulted by the structural parser.
pub trait HeaderSemantics {
    /// Classify the raw header bytes of one entity.
    fn classify(&self, raw_header: &[u8]) -> ContentKind;
}

impl<F> HeaderSemantics for F
where
    F: Fn(&[u8]) -> ContentKind,
{
    fn classify(&self, raw_header: &[u8]) -> ContentKind {
        self(raw_header)
    }
}

/// Default collaborator backed by `mail-parser`'s header parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailParserSemantics;

impl HeaderSemantics for MailParserSemantics {
    fn classify(&self, raw_header: &[u8]) -> ContentKind {
        if raw_header.is_empty() {
            return ContentKind::Single;
        }

        let parser = MessageParser::default();
        let Some(headers) = parser.parse_headers(raw_header) else {
            return ContentKind::Single;
        };

        match headers.content_type() {
            Some(ct) if ct.ctype().eq_ignore_ascii_case("multipart") => {
                let boundary = ct
                    .attribute("boundary")
                    .filter(|b| !b.is_empty())
                    .map(String::from);
                ContentKind::Multipart { boundary }
            }
            _ => ContentKind::Single,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_single() {
        let header = b"Subject: x\r\nContent-Type: text/plain;\r\n\tcharset=\"us-ascii\"\r\n";
        assert_eq!(MailParserSemantics.classify(header), ContentKind::Single);
    }

    #[test]
    fn test_missing_content_type_is_single() {
        assert_eq!(
            MailParserSemantics.classify(b"Subject: no type\r\n"),
            ContentKind::Single
        );
        assert_eq!(MailParserSemantics.classify(b""), ContentKind::Single);
    }

    #[test]
    fn test_multipart_with_quoted_boundary() {
        let header = b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed;\r\n boundary=\"frontier-42\"\r\n";
        assert_eq!(
            MailParserSemantics.classify(header),
            ContentKind::Multipart {
                boundary: Some("frontier-42".to_string())
            }
        );
    }

    #[test]
    fn test_multipart_with_bare_boundary() {
        let header = b"Content-Type: multipart/alternative; boundary=X\r\n";
        let (multipart, boundary) = MailParserSemantics.classify(header).into_parts();
        assert!(multipart);
        assert_eq!(boundary.as_deref(), Some("X"));
    }

    #[test]
    fn test_multipart_without_boundary() {
        let header = b"Content-Type: multipart/mixed\r\n";
        assert_eq!(
            MailParserSemantics.classify(header),
            ContentKind::Multipart { boundary: None }
        );
    }

    #[test]
    fn test_closure_collaborator() {
        let always = |_: &[u8]| ContentKind::Multipart {
            boundary: Some("b".into()),
        };
        assert!(always.classify(b"anything").is_multipart());
    }
}
