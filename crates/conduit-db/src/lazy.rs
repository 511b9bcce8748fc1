//! Process-wide store handle, opened on first use.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::DatabaseError;
use crate::{Store, StoreOptions};

/// Opens the store the first time it is asked for and hands out shared
/// references until [`LazyStore::close`].
pub struct LazyStore {
    path: String,
    options: StoreOptions,
    cell: OnceCell<Arc<Store>>,
}

impl LazyStore {
    pub fn new(path: impl Into<String>, options: StoreOptions) -> Self {
        Self {
            path: path.into(),
            options,
            cell: OnceCell::new(),
        }
    }

    /// The open store, opening it if this is the first call.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if opening or migrating fails. A failed open
    /// is retried on the next call.
    pub async fn get(&self) -> Result<Arc<Store>, DatabaseError> {
        self.cell
            .get_or_try_init(|| async {
                tracing::info!(path = %self.path, "opening store");
                Store::open_local(&self.path, self.options).await.map(Arc::new)
            })
            .await
            .cloned()
    }

    pub fn is_open(&self) -> bool {
        self.cell.initialized()
    }

    /// Drop this handle's reference to the store. The connections close once
    /// every outstanding `Arc` is gone. Returns whether a store was open.
    pub fn close(&mut self) -> bool {
        let closed = self.cell.take().is_some();
        if closed {
            tracing::info!(path = %self.path, "store closed");
        }
        closed
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_once_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazy.db");
        let mut lazy = LazyStore::new(path.to_str().unwrap(), StoreOptions::default());
        assert!(!lazy.is_open());
        assert!(!path.exists());

        let first = lazy.get().await.unwrap();
        let second = lazy.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(lazy.is_open());
        assert!(path.exists());

        assert!(lazy.close());
        assert!(!lazy.is_open());
        assert!(!lazy.close());
    }

    #[tokio::test]
    async fn failed_open_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("x.db");
        let lazy = LazyStore::new(path.to_str().unwrap(), StoreOptions::default());
        assert!(lazy.get().await.is_err());
        assert!(!lazy.is_open());
    }
}
