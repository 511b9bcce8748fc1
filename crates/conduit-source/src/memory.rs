//! In-memory byte source with an instrumented read log.
//!
//! Every `open` appends an [`OpenRecord`] whose counters advance only as
//! chunks are actually pulled, so callers can assert how much of a source a
//! decode really read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use crate::error::SourceError;
use crate::source::{ByteSource, ByteStream};

const DEFAULT_CHUNK_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone)]
struct MemoryEntry {
    content: Bytes,
    /// Emit an I/O error after this many chunks.
    fail_after: Option<usize>,
}

/// Per-open read counters.
#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub source_id: String,
    chunks: Arc<AtomicUsize>,
    bytes: Arc<AtomicU64>,
}

impl OpenRecord {
    #[must_use]
    pub fn chunks_served(&self) -> usize {
        self.chunks.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bytes_served(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Named in-memory sources split into fixed-size chunks.
///
/// Clones share the read log.
#[derive(Debug, Clone)]
pub struct MemorySource {
    sources: HashMap<String, MemoryEntry>,
    chunk_bytes: usize,
    report_size: bool,
    log: Arc<Mutex<Vec<OpenRecord>>>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            report_size: true,
            log: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source_id: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.sources.insert(
            source_id.into(),
            MemoryEntry {
                content: content.into(),
                fail_after: None,
            },
        );
        self
    }

    /// A source that serves `chunks` chunks and then fails with an I/O error.
    #[must_use]
    pub fn with_failing_source(
        mut self,
        source_id: impl Into<String>,
        content: impl Into<Bytes>,
        chunks: usize,
    ) -> Self {
        self.sources.insert(
            source_id.into(),
            MemoryEntry {
                content: content.into(),
                fail_after: Some(chunks),
            },
        );
        self
    }

    #[must_use]
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    /// Stop reporting a size hint, like a chunked HTTP response.
    #[must_use]
    pub const fn without_size_hint(mut self) -> Self {
        self.report_size = false;
        self
    }

    /// Every open so far, oldest first.
    #[must_use]
    pub fn opens(&self) -> Vec<OpenRecord> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn total_chunks_served(&self) -> usize {
        self.opens().iter().map(OpenRecord::chunks_served).sum()
    }

    pub fn reset_log(&self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ByteSource for MemorySource {
    async fn open(&self, source_id: &str) -> Result<ByteStream, SourceError> {
        let entry = self
            .sources
            .get(source_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(source_id.to_string()))?;

        let record = OpenRecord {
            source_id: source_id.to_string(),
            chunks: Arc::default(),
            bytes: Arc::default(),
        };
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());

        let size_hint = self.report_size.then(|| entry.content.len() as u64);
        let content = entry.content;
        let chunk_bytes = self.chunk_bytes;
        let total = content.len().div_ceil(chunk_bytes);
        let served = entry.fail_after.map_or(total, |n| n.min(total));

        let chunks = stream::iter(0..served)
            .map(move |i| {
                let start = i * chunk_bytes;
                let end = (start + chunk_bytes).min(content.len());
                let chunk = content.slice(start..end);
                record.chunks.fetch_add(1, Ordering::Relaxed);
                record.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                Ok::<_, SourceError>(chunk)
            })
            .chain(stream::iter(entry.fail_after.map(|_| {
                Err(SourceError::Io(std::io::Error::other("injected source failure")))
            })))
            .boxed();
        Ok(ByteStream::new(chunks, size_hint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_are_counted_as_they_are_pulled() {
        let source = MemorySource::new()
            .with_source("s", "abcdefghij")
            .with_chunk_bytes(3);
        let mut stream = source.open("s").await.unwrap();
        assert_eq!(stream.size_hint(), Some(10));
        assert_eq!(source.total_chunks_served(), 0);

        let first = stream.next_chunk().await.unwrap().unwrap();
        assert_eq!(&first[..], b"abc");
        assert_eq!(source.total_chunks_served(), 1);

        while stream.next_chunk().await.is_some() {}
        let opens = source.opens();
        assert_eq!(opens.len(), 1);
        assert_eq!(opens[0].chunks_served(), 4);
        assert_eq!(opens[0].bytes_served(), 10);
    }

    #[tokio::test]
    async fn failing_source_errors_after_its_chunks() {
        let source = MemorySource::new()
            .with_failing_source("s", "abcdefghij", 1)
            .with_chunk_bytes(4)
            .without_size_hint();
        let mut stream = source.open("s").await.unwrap();
        assert_eq!(stream.size_hint(), None);
        assert!(stream.next_chunk().await.unwrap().is_ok());
        assert!(matches!(
            stream.next_chunk().await,
            Some(Err(SourceError::Io(_)))
        ));
        assert!(stream.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let err = MemorySource::new().open("nope").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
