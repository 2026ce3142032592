//! Span retrieval: re-read header and content bytes by offset.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::debug;

use crate::error::{Result, ScanError};
use crate::model::report::ParseReport;
use crate::model::span::MessageSpan;
use crate::model::structure::MessageStructure;
use crate::parser::cancel::Cancellation;
use crate::parser::content_type::HeaderSemantics;
use crate::parser::structure::StructureParser;

/// Seek `source` to `span.start` and read exactly `span.length` bytes.
///
/// Returns [`ScanError::SpanOutOfRange`] if the source ends first.
pub async fn read_span<R>(source: &mut R, span: MessageSpan) -> Result<Vec<u8>>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let length = usize::try_from(span.length).map_err(|_| ScanError::SpanOutOfRange { span })?;
    source
        .seek(SeekFrom::Start(span.start))
        .await
        .map_err(|e| ScanError::io(span.start, e))?;
    let mut buffer = vec![0u8; length];
    source.read_exact(&mut buffer).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ScanError::SpanOutOfRange { span }
        } else {
            ScanError::io(span.start, e)
        }
    })?;
    Ok(buffer)
}

/// A message file opened for scanning and random-access span reads.
pub struct SpanStore {
    path: PathBuf,
    file: File,
    len: u64,
}

impl SpanStore {
    /// Open a message file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|e| ScanError::file(&path, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| ScanError::file(&path, e))?
            .len();
        Ok(Self { path, file, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes at open time.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Scan the whole file from offset 0.
    pub async fn scan<S: HeaderSemantics>(
        &mut self,
        parser: &StructureParser<S>,
        cancel: &Cancellation,
    ) -> Result<ParseReport> {
        self.file
            .seek(SeekFrom::Start(0))
            .await
            .map_err(|e| ScanError::file(&self.path, e))?;
        parser.parse(&mut self.file, cancel).await
    }

    /// Bytes of an arbitrary span.
    pub async fn raw(&mut self, span: MessageSpan) -> Result<Vec<u8>> {
        if span.end() > self.len {
            return Err(ScanError::SpanOutOfRange { span });
        }
        debug!(
            offset = span.start,
            length = span.length,
            "Reading span from message file"
        );
        read_span(&mut self.file, span).await
    }

    /// Header bytes of a node, through the last header line's terminator.
    pub async fn header(&mut self, node: &MessageStructure) -> Result<Vec<u8>> {
        self.raw(node.header_span).await
    }

    /// Content bytes of a node.
    pub async fn content(&mut self, node: &MessageStructure) -> Result<Vec<u8>> {
        self.raw(node.content_span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_span_from_cursor() {
        let mut src = Cursor::new(b"0123456789".to_vec());
        let bytes = read_span(&mut src, MessageSpan::new(3, 4)).await.unwrap();
        assert_eq!(bytes, b"3456");
        let empty = read_span(&mut src, MessageSpan::empty_at(10)).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_read_span_past_end() {
        let mut src = Cursor::new(b"short".to_vec());
        let err = read_span(&mut src, MessageSpan::new(2, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::SpanOutOfRange { .. }));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = SpanStore::open("/nonexistent/message.eml")
            .await
            .err()
            .expect("open should fail");
        assert!(matches!(err, ScanError::File { .. }));
    }
}
