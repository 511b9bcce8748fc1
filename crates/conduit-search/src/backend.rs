//! The seam between the engine and its backends.

use std::future::Future;

use conduit_core::enums::SearchBackendKind;
use conduit_core::filter::SearchFilter;
use conduit_core::responses::SearchPage;

use crate::error::SearchError;

/// Something that can answer a filtered, paginated inspection query.
pub trait SearchBackend: Send + Sync {
    fn kind(&self) -> SearchBackendKind;

    /// Return page `filter.page` of the records matching `filter`.
    ///
    /// Implementations normalize the filter (page clamping, blank predicates)
    /// before use and report the normalized `page`/`page_size` in the result.
    fn search(
        &self,
        filter: &SearchFilter,
    ) -> impl Future<Output = Result<SearchPage, SearchError>> + Send;
}

/// Normalize and validate a filter against a page-size ceiling.
pub(crate) fn prepare(
    filter: &SearchFilter,
    max_page_size: u32,
) -> Result<SearchFilter, SearchError> {
    let filter = filter.clone().normalized(max_page_size);
    filter.validate()?;
    Ok(filter)
}
