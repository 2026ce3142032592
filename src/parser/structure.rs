//! Structural parser: one forward pass from byte stream to structure tree.
//!
//! Every entity in the message is tracked on a stack while the scan is
//! inside it. The bottom of the stack is the message itself; each entity
//! above is a body part of the one below. A line is offered first to the
//! boundary detectors of the enclosing multiparts (innermost first), then
//! to the header locator of the innermost entity. Nested parts therefore
//! come out of the same single pass that finds the outer ones, and no byte
//! is read twice.
//!
//! The pass is tolerant of:
//!
//! - Mixed `\n` and `\r\n` line endings
//! - Multiparts with no boundary parameter (kept as leaves)
//! - Missing terminal delimiters, at any depth
//! - Inner multiparts cut short by an outer delimiter
//! - Header blocks with no blank line before end of stream

use tokio::io::AsyncRead;
use tracing::{debug, trace, warn};

use crate::config::ScannerConfig;
use crate::error::{Result, ScanError};
use crate::model::report::{Diagnostic, ParseReport};
use crate::model::span::MessageSpan;
use crate::model::structure::MessageStructure;
use crate::parser::boundary::{BoundaryDetector, DelimiterKind};
use crate::parser::cancel::Cancellation;
use crate::parser::content_type::{ContentKind, HeaderSemantics, MailParserSemantics};
use crate::parser::header::{HeaderBlock, HeaderBlockLocator};
use crate::parser::line::{Line, LineScanner, ProgressFn};

/// Builds a [`MessageStructure`] from an asynchronous byte source.
///
/// The parser itself is stateless between calls and may be reused. Each
/// call assumes exclusive use of the source's read cursor.
pub struct StructureParser<S = MailParserSemantics> {
    config: ScannerConfig,
    semantics: S,
    progress: Option<Box<ProgressFn>>,
}

impl StructureParser<MailParserSemantics> {
    /// Parser using `mail-parser` for content-type inspection.
    pub fn new(config: ScannerConfig) -> Self {
        Self::with_semantics(config, MailParserSemantics)
    }
}

impl Default for StructureParser<MailParserSemantics> {
    fn default() -> Self {
        Self::new(ScannerConfig::default())
    }
}

impl<S: HeaderSemantics> StructureParser<S> {
    /// Parser with a custom header-semantics collaborator.
    pub fn with_semantics(config: ScannerConfig, semantics: S) -> Self {
        Self {
            config,
            semantics,
            progress: None,
        }
    }

    /// Report bytes read (every 4 MB and once at the end).
    pub fn on_progress(mut self, progress: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scan `source` from its current position, which is taken as offset 0.
    ///
    /// Fails on I/O errors, over-long lines and cancellation; a cancelled
    /// scan never yields a partial tree. Framing anomalies are returned as
    /// diagnostics next to a best-effort tree.
    pub async fn parse<R>(&self, source: &mut R, cancel: &Cancellation) -> Result<ParseReport>
    where
        R: AsyncRead + Unpin,
    {
        let mut scanner =
            LineScanner::new(source, cancel, &self.config).with_progress(self.progress.as_deref());
        let mut scan = Scan::new(self.config.max_header_size);

        while let Some(line) = scanner.next_line().await? {
            let content = scanner.line_bytes(&line);
            self.feed(&mut scan, &line, content, cancel)?;
            scan.previous = Some(line);
        }
        scanner.finish_progress();

        let stream_length = scanner.offset();
        let (structure, diagnostics) = scan.finish(stream_length);
        debug!(
            length = stream_length,
            nodes = structure.node_count(),
            diagnostics = diagnostics.len(),
            "Structure scan complete"
        );

        Ok(ParseReport {
            structure,
            diagnostics,
            stream_length,
        })
    }

    fn feed(
        &self,
        scan: &mut Scan,
        line: &Line,
        content: &[u8],
        cancel: &Cancellation,
    ) -> Result<()> {
        if let Some((level, kind)) = scan.match_delimiter(content) {
            return scan.on_delimiter(level, kind, line, cancel);
        }

        let Scan {
            stack, diagnostics, ..
        } = scan;
        let Some(entity) = stack.last_mut() else {
            return Ok(());
        };
        let is_separator = match entity.locator.as_mut() {
            Some(locator) => locator.push(line, content),
            None => false,
        };
        if is_separator {
            if let Some(locator) = entity.locator.take() {
                let block = locator.finish_at_separator(line);
                self.enter_body(entity, block, diagnostics);
            }
        }
        Ok(())
    }

    /// Switch an entity from header to body and decide whether to split it.
    fn enter_body(&self, entity: &mut Entity, block: HeaderBlock, diagnostics: &mut Vec<Diagnostic>) {
        if block.truncated {
            diagnostics.push(Diagnostic::HeaderTooLarge {
                offset: entity.start,
                limit: self.config.max_header_size,
            });
        }
        entity.header_span = block.header_span;
        entity.content_start = block.content_start;

        match self.semantics.classify(&block.raw) {
            ContentKind::Single => {}
            ContentKind::Multipart { boundary: None } => {
                warn!(
                    offset = entity.start,
                    "Multipart without boundary parameter, treating as single part"
                );
                diagnostics.push(Diagnostic::MissingBoundary {
                    offset: entity.start,
                });
            }
            ContentKind::Multipart { boundary: Some(_) }
                if entity.depth >= self.config.max_depth =>
            {
                warn!(
                    offset = entity.start,
                    max_depth = self.config.max_depth,
                    "Multipart nesting too deep, treating as single part"
                );
                diagnostics.push(Diagnostic::DepthLimit {
                    offset: entity.start,
                    depth: self.config.max_depth,
                });
            }
            ContentKind::Multipart {
                boundary: Some(token),
            } => {
                debug!(
                    offset = entity.start,
                    depth = entity.depth,
                    boundary = %token,
                    "Multipart body"
                );
                entity.detector = Some(BoundaryDetector::new(token, self.config.delimiter));
            }
        }
    }
}

/// Scan a source with the default configuration.
pub async fn parse_structure<R>(source: &mut R, cancel: &Cancellation) -> Result<ParseReport>
where
    R: AsyncRead + Unpin,
{
    StructureParser::default().parse(source, cancel).await
}

/// One entity the scan is currently inside.
#[derive(Debug)]
struct Entity {
    start: u64,
    depth: usize,
    /// Present until the header separator is found.
    locator: Option<HeaderBlockLocator>,
    header_span: MessageSpan,
    content_start: u64,
    /// Present for a multipart body being split.
    detector: Option<BoundaryDetector>,
    parts: Vec<MessageStructure>,
}

impl Entity {
    fn new(start: u64, depth: usize, max_header_size: usize) -> Self {
        Self {
            start,
            depth,
            locator: Some(HeaderBlockLocator::new(start, max_header_size)),
            header_span: MessageSpan::empty_at(start),
            content_start: start,
            detector: None,
            parts: Vec::new(),
        }
    }

    /// Close the entity with its last byte just before `end`.
    fn finish(self, end: u64, diagnostics: &mut Vec<Diagnostic>) -> MessageStructure {
        let end = end.max(self.start);

        if let Some(locator) = self.locator {
            let limit = locator.max_header_size();
            let block = locator.finish_at(end);
            if block.truncated {
                diagnostics.push(Diagnostic::HeaderTooLarge {
                    offset: self.start,
                    limit,
                });
            }
            return MessageStructure::leaf(block.header_span, MessageSpan::empty_at(end));
        }

        if let Some(detector) = self.detector {
            let boundary = detector.token().to_string();
            let finish = detector.finish(end);
            if !finish.terminated {
                warn!(
                    offset = self.content_start,
                    boundary = %boundary,
                    parts = self.parts.len(),
                    "Multipart ended without terminal delimiter"
                );
                diagnostics.push(Diagnostic::TruncatedMultipart {
                    offset: self.content_start,
                    boundary,
                });
            }
        }

        MessageStructure {
            header_span: self.header_span,
            content_span: MessageSpan::between(self.content_start.min(end), end),
            parts: self.parts,
        }
    }
}

/// Mutable state of one pass.
struct Scan {
    stack: Vec<Entity>,
    diagnostics: Vec<Diagnostic>,
    previous: Option<Line>,
    max_header_size: usize,
}

impl Scan {
    fn new(max_header_size: usize) -> Self {
        Self {
            stack: vec![Entity::new(0, 0, max_header_size)],
            diagnostics: Vec::new(),
            previous: None,
            max_header_size,
        }
    }

    /// Innermost active multipart whose boundary `content` matches.
    fn match_delimiter(&self, content: &[u8]) -> Option<(usize, DelimiterKind)> {
        if !content.starts_with(b"--") {
            return None;
        }
        self.stack.iter().enumerate().rev().find_map(|(level, entity)| {
            entity
                .detector
                .as_ref()
                .and_then(|d| d.classify(content))
                .map(|kind| (level, kind))
        })
    }

    fn on_delimiter(
        &mut self,
        level: usize,
        kind: DelimiterKind,
        line: &Line,
        cancel: &Cancellation,
    ) -> Result<()> {
        let previous = self.previous;
        let Some(detector) = self.stack.get_mut(level).and_then(|e| e.detector.as_mut()) else {
            return Ok(());
        };
        let event = detector.apply(kind, line, previous.as_ref());

        if let Some(closed) = event.closed {
            trace!(part = %closed, "Part closed");
            self.close_above(level, closed.end());
        }

        if let Some(start) = event.opened {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled { offset: start });
            }
            let depth = self.stack[level].depth + 1;
            trace!(offset = start, depth, "Part opened");
            self.stack
                .push(Entity::new(start, depth, self.max_header_size));
        }
        Ok(())
    }

    /// Finish every entity above `level` at `end`, attaching each to its parent.
    fn close_above(&mut self, level: usize, end: u64) {
        while self.stack.len() > level + 1 {
            let Some(entity) = self.stack.pop() else {
                break;
            };
            let node = entity.finish(end, &mut self.diagnostics);
            if let Some(parent) = self.stack.last_mut() {
                parent.parts.push(node);
            }
        }
    }

    /// End of stream: close everything and return the root.
    fn finish(mut self, end: u64) -> (MessageStructure, Vec<Diagnostic>) {
        self.close_above(0, end);
        let root = match self.stack.pop() {
            Some(root) => root.finish(end, &mut self.diagnostics),
            None => MessageStructure::leaf(MessageSpan::empty_at(0), MessageSpan::empty_at(end)),
        };
        (root, self.diagnostics)
    }
}
