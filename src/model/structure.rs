//! The structure tree returned by a scan.

use super::span::MessageSpan;

/// Header and content regions of one MIME entity, with its body parts.
///
/// The tree is a read-only index over a stream the caller owns. It holds no
/// message bytes, so it stays valid regardless of where the stream's cursor
/// is afterwards.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageStructure {
    /// Header block, up to and including the last header line's terminator.
    /// Excludes the blank separator line.
    pub header_span: MessageSpan,

    /// Body bytes following the separator. For a multipart entity this is
    /// the whole body region, preamble and epilogue included.
    pub content_span: MessageSpan,

    /// Body parts in stream order. Empty unless the header declared a
    /// multipart content type with a usable boundary.
    pub parts: Vec<MessageStructure>,
}

impl MessageStructure {
    /// A structure without parts.
    pub fn leaf(header_span: MessageSpan, content_span: MessageSpan) -> Self {
        Self {
            header_span,
            content_span,
            parts: Vec::new(),
        }
    }

    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Region covered by the header and the content together.
    pub fn full_span(&self) -> MessageSpan {
        MessageSpan::between(self.header_span.start, self.content_span.end())
    }

    /// Resolve a dotted, 1-based part path (`"2.1"`). An empty path is the
    /// node itself.
    pub fn part(&self, path: &str) -> Option<&MessageStructure> {
        let path = path.trim();
        if path.is_empty() {
            return Some(self);
        }
        let mut node = self;
        for segment in path.split('.') {
            let index: usize = segment.parse().ok()?;
            node = node.parts.get(index.checked_sub(1)?)?;
        }
        Some(node)
    }

    /// Visit every node depth-first in stream order.
    ///
    /// The visitor receives the node's 1-based path (empty for the root).
    pub fn walk(&self, visitor: &mut dyn FnMut(&[usize], &MessageStructure)) {
        let mut path = Vec::new();
        self.walk_inner(&mut path, visitor);
    }

    fn walk_inner(
        &self,
        path: &mut Vec<usize>,
        visitor: &mut dyn FnMut(&[usize], &MessageStructure),
    ) {
        visitor(path, self);
        for (idx, part) in self.parts.iter().enumerate() {
            path.push(idx + 1);
            part.walk_inner(path, visitor);
            path.pop();
        }
    }

    /// Number of nodes in the tree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.parts.iter().map(Self::node_count).sum::<usize>()
    }

    /// Nesting depth: 0 for a leaf.
    pub fn depth(&self) -> usize {
        self.parts
            .iter()
            .map(|p| p.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Render a part path the way `part()` accepts it.
pub fn format_path(path: &[usize]) -> String {
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> MessageStructure {
        let inner = MessageStructure {
            header_span: MessageSpan::new(60, 10),
            content_span: MessageSpan::new(72, 40),
            parts: vec![
                MessageStructure::leaf(MessageSpan::new(80, 5), MessageSpan::new(87, 3)),
                MessageStructure::leaf(MessageSpan::new(95, 5), MessageSpan::new(102, 4)),
            ],
        };
        MessageStructure {
            header_span: MessageSpan::new(0, 20),
            content_span: MessageSpan::new(22, 100),
            parts: vec![
                MessageStructure::leaf(MessageSpan::new(30, 10), MessageSpan::new(42, 8)),
                inner,
            ],
        }
    }

    #[test]
    fn test_part_lookup() {
        let tree = sample_tree();
        assert_eq!(tree.part(""), Some(&tree));
        assert_eq!(tree.part("1").map(|p| p.header_span.start), Some(30));
        assert_eq!(tree.part("2.2").map(|p| p.content_span.start), Some(102));
        assert!(tree.part("0").is_none());
        assert!(tree.part("3").is_none());
        assert!(tree.part("1.1").is_none());
        assert!(tree.part("x").is_none());
    }

    #[test]
    fn test_walk_order_and_paths() {
        let tree = sample_tree();
        let mut seen = Vec::new();
        tree.walk(&mut |path, node| seen.push((format_path(path), node.header_span.start)));
        assert_eq!(
            seen,
            vec![
                (String::new(), 0),
                ("1".to_string(), 30),
                ("2".to_string(), 60),
                ("2.1".to_string(), 80),
                ("2.2".to_string(), 95),
            ]
        );
    }

    #[test]
    fn test_counts() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.depth(), 2);
        assert!(tree.is_multipart());
        assert!(!tree.parts[0].is_multipart());
        assert_eq!(tree.full_span(), MessageSpan::new(0, 122));
    }
}
