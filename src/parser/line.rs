//! Incremental line scanner over an asynchronous byte source.
//!
//! Reads the source in fixed-size chunks and yields one logical line at a
//! time as a span. Never seeks backward and never holds more than one
//! partial line plus one chunk in memory.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::config::ScannerConfig;
use crate::error::{Result, ScanError};
use crate::model::span::MessageSpan;
use crate::parser::cancel::Cancellation;

/// Smallest chunk requested from the source, whatever the configuration says.
const MIN_READ_BUFFER_SIZE: usize = 512;

/// Report progress at most every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Progress callback: receives the number of bytes read so far.
pub type ProgressFn = dyn Fn(u64) + Send + Sync;

/// How a line was terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Canonical `\r\n`.
    CrLf,
    /// Bare `\n`, accepted for robustness.
    Lf,
    /// Final line of the stream with no terminator.
    None,
}

impl Terminator {
    /// Number of bytes the terminator occupies.
    pub fn len(self) -> u64 {
        match self {
            Terminator::CrLf => 2,
            Terminator::Lf => 1,
            Terminator::None => 0,
        }
    }

    pub fn is_none(self) -> bool {
        self == Terminator::None
    }
}

/// One line of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// Full extent of the line, terminator included.
    pub span: MessageSpan,
    pub terminator: Terminator,
    /// Starts with a space or tab (a folded header line).
    pub continuation: bool,
}

impl Line {
    pub fn start(&self) -> u64 {
        self.span.start
    }

    /// Offset of the first byte after the terminator.
    pub fn end(&self) -> u64 {
        self.span.end()
    }

    /// Length without the terminator.
    pub fn content_len(&self) -> u64 {
        self.span.length - self.terminator.len()
    }

    /// A zero-length line: just a terminator.
    pub fn is_blank(&self) -> bool {
        self.content_len() == 0 && !self.terminator.is_none()
    }
}

/// Forward-only line reader.
pub struct LineScanner<'a, R> {
    source: &'a mut R,
    cancel: &'a Cancellation,
    progress: Option<&'a ProgressFn>,
    /// Unconsumed bytes; `buf[0]` sits at stream offset `base`.
    buf: Vec<u8>,
    /// Index in `buf` of the first byte after the last returned line.
    pos: usize,
    base: u64,
    eof: bool,
    chunk_size: usize,
    max_line_length: usize,
    last_progress: u64,
}

impl<'a, R> LineScanner<'a, R>
where
    R: AsyncRead + Unpin,
{
    /// Create a scanner positioned at stream offset 0.
    pub fn new(source: &'a mut R, cancel: &'a Cancellation, config: &ScannerConfig) -> Self {
        let chunk_size = config.read_buffer_size.max(MIN_READ_BUFFER_SIZE);
        Self {
            source,
            cancel,
            progress: None,
            buf: Vec::with_capacity(chunk_size),
            pos: 0,
            base: 0,
            eof: false,
            chunk_size,
            max_line_length: config.max_line_length,
            last_progress: 0,
        }
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: Option<&'a ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Stream offset just after the last returned line.
    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Total bytes received from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.base + self.buf.len() as u64
    }

    /// Read the next line.
    ///
    /// Returns `Ok(None)` at end of stream. A final line without terminator
    /// is returned with [`Terminator::None`].
    pub async fn next_line(&mut self) -> Result<Option<Line>> {
        let mut scan_from = self.pos;
        loop {
            if let Some(i) = memchr_newline(&self.buf[scan_from..]) {
                return self.take_line(scan_from + i + 1).map(Some);
            }
            scan_from = self.buf.len();

            let pending = self.buf.len() - self.pos;
            // A CR may still be waiting for its LF, hence the extra byte.
            if pending > self.max_line_length + 1 {
                return Err(ScanError::LineTooLong {
                    offset: self.offset(),
                    limit: self.max_line_length,
                });
            }

            if self.eof {
                if pending == 0 {
                    return Ok(None);
                }
                return self.take_line(self.buf.len()).map(Some);
            }

            let compacted = self.pos;
            self.fill().await?;
            scan_from -= compacted;
        }
    }

    /// Content bytes of the most recently returned line, terminator excluded.
    ///
    /// Only valid until the next call to [`next_line`](Self::next_line).
    pub fn line_bytes(&self, line: &Line) -> &[u8] {
        let start = line.start().saturating_sub(self.base) as usize;
        let end = (start + line.content_len() as usize).min(self.buf.len());
        &self.buf[start.min(end)..end]
    }

    /// Emit a final progress report for everything read.
    pub fn finish_progress(&mut self) {
        if let Some(cb) = self.progress {
            cb(self.bytes_read());
        }
    }

    fn take_line(&mut self, end: usize) -> Result<Line> {
        let raw = &self.buf[self.pos..end];
        let terminator = if raw.ends_with(b"\r\n") {
            Terminator::CrLf
        } else if raw.ends_with(b"\n") {
            Terminator::Lf
        } else {
            Terminator::None
        };
        let continuation = matches!(raw.first(), Some(b' ' | b'\t'));

        let span = MessageSpan::new(self.offset(), raw.len() as u64);
        let line = Line {
            span,
            terminator,
            continuation,
        };
        if line.content_len() > self.max_line_length as u64 {
            return Err(ScanError::LineTooLong {
                offset: span.start,
                limit: self.max_line_length,
            });
        }

        self.pos = end;
        Ok(line)
    }

    /// Drop consumed bytes and read one more chunk.
    ///
    /// This is the only suspension point of the scan.
    async fn fill(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled {
                offset: self.bytes_read(),
            });
        }

        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.base += self.pos as u64;
            self.pos = 0;
        }

        let len = self.buf.len();
        self.buf.resize(len + self.chunk_size, 0);
        let read = self.source.read(&mut self.buf[len..]).await;
        match read {
            Ok(0) => {
                self.buf.truncate(len);
                self.eof = true;
                trace!(offset = self.bytes_read(), "End of stream");
            }
            Ok(n) => {
                self.buf.truncate(len + n);
                self.report_progress();
            }
            Err(e) => {
                self.buf.truncate(len);
                return Err(ScanError::io(self.bytes_read(), e));
            }
        }
        Ok(())
    }

    fn report_progress(&mut self) {
        if let Some(cb) = self.progress {
            let read = self.bytes_read();
            if read - self.last_progress >= PROGRESS_INTERVAL {
                cb(read);
                self.last_progress = read;
            }
        }
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}
