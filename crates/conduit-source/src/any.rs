//! Config-selected byte source.

use std::time::Duration;

use conduit_config::SourceConfig;

use crate::error::SourceError;
use crate::file::FileSource;
use crate::http::{HttpOptions, HttpSource};
use crate::memory::MemorySource;
use crate::source::{ByteSource, ByteStream};

/// Enum dispatch over the concrete sources so callers can hold one type.
#[derive(Debug, Clone)]
pub enum AnySource {
    Http(HttpSource),
    File(FileSource),
    Memory(MemorySource),
}

impl AnySource {
    /// `http(s)://` base URLs select [`HttpSource`]; anything else is treated
    /// as a directory for [`FileSource`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidLocation`] if no base URL is configured,
    /// or [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        if !config.is_configured() {
            return Err(SourceError::InvalidLocation(
                "source.base_url is not set".to_string(),
            ));
        }
        if config.is_remote() {
            let options = HttpOptions {
                timeout: Duration::from_secs(config.timeout_secs),
                user_agent: config.user_agent.clone(),
            };
            return HttpSource::new(&config.base_url, &options).map(Self::Http);
        }
        Ok(Self::File(
            FileSource::new(config.base_url.trim()).with_read_bytes(config.buffer_bytes),
        ))
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::File(_) => "file",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<MemorySource> for AnySource {
    fn from(source: MemorySource) -> Self {
        Self::Memory(source)
    }
}

impl ByteSource for AnySource {
    async fn open(&self, source_id: &str) -> Result<ByteStream, SourceError> {
        match self {
            Self::Http(s) => s.open(source_id).await,
            Self::File(s) => s.open(source_id).await,
            Self::Memory(s) => s.open(source_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_base_url() {
        let mut config = SourceConfig {
            base_url: "https://data.example.com".into(),
            ..Default::default()
        };
        assert_eq!(AnySource::from_config(&config).unwrap().kind(), "http");

        config.base_url = "./data".into();
        assert_eq!(AnySource::from_config(&config).unwrap().kind(), "file");

        config.base_url = String::new();
        assert!(matches!(
            AnySource::from_config(&config),
            Err(SourceError::InvalidLocation(_))
        ));
    }
}
