//! Header block location: the split between header fields and body.
//!
//! Field names and values are not interpreted here. The raw header bytes are
//! buffered (up to a limit) so the content-type collaborator can inspect them.

use tokio::io::AsyncRead;
use tracing::{debug, warn};

use crate::config::ScannerConfig;
use crate::error::Result;
use crate::model::span::MessageSpan;
use crate::parser::cancel::Cancellation;
use crate::parser::line::{Line, LineScanner, Terminator};

/// Header/body split of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    /// From the entity start to the start of the separator line.
    pub header_span: MessageSpan,
    /// First byte after the separator line. Equal to the header end when no
    /// separator was found.
    pub content_start: u64,
    /// Whether a blank separator line was seen.
    pub has_separator: bool,
    /// Verbatim header bytes, possibly cut at the buffering limit.
    pub raw: Vec<u8>,
    /// `raw` holds only a prefix of the header.
    pub truncated: bool,
}

/// Accumulates header lines until the blank separator line.
#[derive(Debug)]
pub struct HeaderBlockLocator {
    start: u64,
    raw: Vec<u8>,
    max_header_size: usize,
    truncated: bool,
}

impl HeaderBlockLocator {
    /// Start a header block at stream offset `start`.
    pub fn new(start: u64, max_header_size: usize) -> Self {
        Self {
            start,
            raw: Vec::new(),
            max_header_size,
            truncated: false,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    /// Feed one line. Returns `true` when it is the separator, which ends
    /// the block and is not buffered.
    ///
    /// Folded lines are ordinary header lines here.
    pub fn push(&mut self, line: &Line, content: &[u8]) -> bool {
        if line.is_blank() {
            return true;
        }
        if self.truncated {
            return false;
        }

        let terminator: &[u8] = match line.terminator {
            Terminator::CrLf => b"\r\n",
            Terminator::Lf => b"\n",
            Terminator::None => b"",
        };
        if self.raw.len() + content.len() + terminator.len() > self.max_header_size {
            warn!(
                offset = self.start,
                limit = self.max_header_size,
                "Header block exceeds buffering limit, inspecting prefix only"
            );
            self.truncated = true;
            return false;
        }
        self.raw.extend_from_slice(content);
        self.raw.extend_from_slice(terminator);
        false
    }

    /// Close the block at the separator line.
    pub fn finish_at_separator(self, separator: &Line) -> HeaderBlock {
        HeaderBlock {
            header_span: MessageSpan::between(self.start, separator.start()),
            content_start: separator.end(),
            has_separator: true,
            raw: self.raw,
            truncated: self.truncated,
        }
    }

    /// Close the block without a separator: everything up to `end` is header
    /// and the content is empty.
    pub fn finish_at(self, end: u64) -> HeaderBlock {
        let end = end.max(self.start);
        HeaderBlock {
            header_span: MessageSpan::between(self.start, end),
            content_start: end,
            has_separator: false,
            raw: self.raw,
            truncated: self.truncated,
        }
    }
}

/// Locate the header block of a stream positioned at offset 0.
///
/// Stops reading right after the separator line. With no separator the
/// whole stream is header; this is not an error.
pub async fn locate_header_block<R>(
    source: &mut R,
    cancel: &Cancellation,
    config: &ScannerConfig,
) -> Result<HeaderBlock>
where
    R: AsyncRead + Unpin,
{
    let mut scanner = LineScanner::new(source, cancel, config);
    let mut locator = HeaderBlockLocator::new(0, config.max_header_size);

    while let Some(line) = scanner.next_line().await? {
        let content = scanner.line_bytes(&line);
        if locator.push(&line, content) {
            let block = locator.finish_at_separator(&line);
            debug!(header = %block.header_span, "Found header separator");
            return Ok(block);
        }
    }

    let end = scanner.offset();
    debug!(end, "No header separator before end of stream");
    Ok(locator.finish_at(end))
}
