//! Indexed backend: filtered queries against the structured store.

use std::sync::Arc;

use conduit_core::enums::SearchBackendKind;
use conduit_core::filter::{DEFAULT_MAX_PAGE_SIZE, SearchFilter};
use conduit_core::responses::SearchPage;
use conduit_db::Store;

use crate::backend::{SearchBackend, prepare};
use crate::error::SearchError;

/// Answers searches from the store's indexed columns. Counts are exact.
#[derive(Clone)]
pub struct IndexedBackend {
    store: Arc<Store>,
    max_page_size: u32,
}

impl IndexedBackend {
    pub const fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl SearchBackend for IndexedBackend {
    fn kind(&self) -> SearchBackendKind {
        SearchBackendKind::Indexed
    }

    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage, SearchError> {
        let filter = prepare(filter, self.max_page_size)?;
        let (results, total_count) = self.store.search(&filter).await?;
        tracing::debug!(
            page = filter.page,
            page_size = filter.page_size,
            returned = results.len(),
            total_count,
            "indexed search"
        );
        Ok(SearchPage {
            results,
            total_count,
            page: filter.page,
            page_size: filter.page_size,
            backend: SearchBackendKind::Indexed,
            count_exact: true,
        })
    }
}
