//! The byte-source seam the decoder reads through.

use std::future::Future;

use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};

use crate::error::SourceError;

/// An opened source: a stream of transport chunks plus the total size in
/// bytes when the transport reports one.
pub struct ByteStream {
    chunks: BoxStream<'static, Result<Bytes, SourceError>>,
    size_hint: Option<u64>,
}

impl ByteStream {
    pub fn new(chunks: BoxStream<'static, Result<Bytes, SourceError>>, size_hint: Option<u64>) -> Self {
        Self { chunks, size_hint }
    }

    /// A stream with no chunks, used once a decode no longer needs its source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(futures_util::stream::empty().boxed(), None)
    }

    #[must_use]
    pub const fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Pull the next transport chunk.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, SourceError>> {
        self.chunks.next().await
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("size_hint", &self.size_hint)
            .finish_non_exhaustive()
    }
}

/// Something that can open a named source as a byte stream.
///
/// Opening performs the request (or file open) and surfaces status errors
/// immediately; the body is then pulled lazily chunk by chunk.
pub trait ByteSource: Send + Sync {
    fn open(&self, source_id: &str) -> impl Future<Output = Result<ByteStream, SourceError>> + Send;
}

impl<S: ByteSource> ByteSource for &S {
    fn open(&self, source_id: &str) -> impl Future<Output = Result<ByteStream, SourceError>> + Send {
        (**self).open(source_id)
    }
}

impl<S: ByteSource> ByteSource for std::sync::Arc<S> {
    fn open(&self, source_id: &str) -> impl Future<Output = Result<ByteStream, SourceError>> + Send {
        (**self).open(source_id)
    }
}
