//! Local-directory byte source.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;

use crate::error::SourceError;
use crate::source::{ByteSource, ByteStream};

const DEFAULT_READ_BYTES: usize = 64 * 1024;

/// Sources stored as files under `root`, read in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
    read_bytes: usize,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_bytes: DEFAULT_READ_BYTES,
        }
    }

    #[must_use]
    pub fn with_read_bytes(mut self, read_bytes: usize) -> Self {
        self.read_bytes = read_bytes.max(1);
        self
    }

    /// Resolve a source id to a path, refusing ids that climb out of `root`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidLocation`] for absolute or `..` ids.
    pub fn path_for(&self, source_id: &str) -> Result<PathBuf, SourceError> {
        let rel = Path::new(source_id);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SourceError::InvalidLocation(source_id.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl ByteSource for FileSource {
    async fn open(&self, source_id: &str) -> Result<ByteStream, SourceError> {
        let path = self.path_for(source_id)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(source_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size_hint = file.metadata().await.ok().map(|m| m.len());
        tracing::debug!(path = %path.display(), ?size_hint, "opening file source");

        let read_bytes = self.read_bytes;
        let chunks = stream::try_unfold(file, move |mut file| async move {
            let mut buf = vec![0u8; read_bytes];
            let n = file.read(&mut buf).await.map_err(SourceError::Io)?;
            if n == 0 {
                return Ok::<_, SourceError>(None);
            }
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), file)))
        })
        .boxed();
        Ok(ByteStream::new(chunks, size_hint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_whole_file_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jsonl"), "0123456789").unwrap();
        let source = FileSource::new(dir.path()).with_read_bytes(4);

        let mut stream = source.open("a.jsonl").await.unwrap();
        assert_eq!(stream.size_hint(), Some(10));
        let mut sizes = Vec::new();
        while let Some(chunk) = stream.next_chunk().await {
            sizes.push(chunk.unwrap().len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::new(dir.path()).open("nope.jsonl").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn escaping_ids_are_rejected() {
        let source = FileSource::new("/data");
        assert!(source.path_for("../etc/passwd").is_err());
        assert!(source.path_for("/etc/passwd").is_err());
        assert_eq!(
            source.path_for("2024/a.jsonl").unwrap(),
            PathBuf::from("/data/2024/a.jsonl")
        );
    }
}
