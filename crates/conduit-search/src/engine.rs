//! Backend selection.

use std::fmt;
use std::str::FromStr;

use conduit_core::enums::SearchBackendKind;
use conduit_core::filter::SearchFilter;
use conduit_core::responses::SearchPage;
use conduit_source::ByteSource;
use serde::{Deserialize, Serialize};

use crate::backend::SearchBackend;
use crate::error::SearchError;
use crate::indexed::IndexedBackend;
use crate::streaming::StreamingBackend;

/// Which backend a search should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    /// Indexed when a store is configured, streaming otherwise.
    #[default]
    Auto,
    Indexed,
    Streaming,
}

impl BackendChoice {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Indexed => "indexed",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "indexed" => Ok(Self::Indexed),
            "streaming" => Ok(Self::Streaming),
            other => Err(format!(
                "unknown backend '{other}' (expected auto, indexed or streaming)"
            )),
        }
    }
}

/// One search contract over whichever backends are configured.
pub struct SearchEngine<S> {
    indexed: Option<IndexedBackend>,
    streaming: Option<StreamingBackend<S>>,
}

impl<S> Default for SearchEngine<S> {
    fn default() -> Self {
        Self {
            indexed: None,
            streaming: None,
        }
    }
}

impl<S: ByteSource> SearchEngine<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_indexed(mut self, backend: IndexedBackend) -> Self {
        self.indexed = Some(backend);
        self
    }

    #[must_use]
    pub fn with_streaming(mut self, backend: StreamingBackend<S>) -> Self {
        self.streaming = Some(backend);
        self
    }

    /// Configured backends, indexed first.
    pub fn available(&self) -> Vec<SearchBackendKind> {
        let mut kinds = Vec::with_capacity(2);
        if let Some(b) = &self.indexed {
            kinds.push(b.kind());
        }
        if let Some(b) = &self.streaming {
            kinds.push(b.kind());
        }
        kinds
    }

    /// Run `filter` on the backend named by `choice`.
    ///
    /// Under [`BackendChoice::Auto`] a store failure falls back to the
    /// streaming backend when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Unavailable`] if the chosen backend is not
    /// configured, or the backend's own error.
    pub async fn search(
        &self,
        filter: &SearchFilter,
        choice: BackendChoice,
    ) -> Result<SearchPage, SearchError> {
        match choice {
            BackendChoice::Indexed => self.indexed()?.search(filter).await,
            BackendChoice::Streaming => self.streaming()?.search(filter).await,
            BackendChoice::Auto => match (&self.indexed, &self.streaming) {
                (Some(indexed), Some(streaming)) => match indexed.search(filter).await {
                    Err(SearchError::Database(e)) => {
                        tracing::warn!(error = %e, "indexed search failed; falling back to streaming");
                        streaming.search(filter).await
                    }
                    other => other,
                },
                (Some(indexed), None) => indexed.search(filter).await,
                (None, Some(streaming)) => streaming.search(filter).await,
                (None, None) => Err(SearchError::Unavailable(
                    "no search backend configured".to_string(),
                )),
            },
        }
    }

    fn indexed(&self) -> Result<&IndexedBackend, SearchError> {
        self.indexed
            .as_ref()
            .ok_or_else(|| SearchError::Unavailable("no store is open".to_string()))
    }

    fn streaming(&self) -> Result<&StreamingBackend<S>, SearchError> {
        self.streaming
            .as_ref()
            .ok_or_else(|| SearchError::Unavailable("no sources configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_source::MemorySource;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("auto", BackendChoice::Auto)]
    #[case("Indexed", BackendChoice::Indexed)]
    #[case(" streaming ", BackendChoice::Streaming)]
    fn parses_backend_choice(#[case] input: &str, #[case] expected: BackendChoice) {
        assert_eq!(input.parse::<BackendChoice>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = "vector".parse::<BackendChoice>().unwrap_err();
        assert!(err.contains("vector"));
    }

    #[tokio::test]
    async fn empty_engine_is_unavailable() {
        let engine = SearchEngine::<MemorySource>::new();
        assert!(engine.available().is_empty());
        for choice in [BackendChoice::Auto, BackendChoice::Indexed, BackendChoice::Streaming] {
            let err = engine
                .search(&SearchFilter::default(), choice)
                .await
                .unwrap_err();
            assert!(matches!(err, SearchError::Unavailable(_)));
        }
    }
}
