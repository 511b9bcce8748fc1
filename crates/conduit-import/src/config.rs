//! The importer's single configuration surface.

use conduit_config::{ImportSettings, SourceConfig};
use conduit_source::DecoderConfig;

use crate::error::ImportError;

/// Chunk, batch and decoder sizing for one importer.
///
/// `chunk_size` caps the lines read per decode call: it is the decoder's
/// record `limit` and also a line budget, so malformed lines cannot grow a
/// chunk. `batch_size` caps the lines per transaction and checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportConfig {
    pub chunk_size: u32,
    pub batch_size: u32,
    pub dedup: bool,
    pub decoder: DecoderConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            batch_size: 100,
            dedup: true,
            decoder: DecoderConfig::default(),
        }
    }
}

impl ImportConfig {
    #[must_use]
    pub fn from_settings(import: &ImportSettings, source: &SourceConfig) -> Self {
        Self {
            chunk_size: import.chunk_size,
            batch_size: import.batch_size,
            dedup: import.dedup,
            decoder: DecoderConfig {
                buffer_bytes: source.buffer_bytes,
                max_record_bytes: source.max_record_bytes,
            },
        }
    }

    #[must_use]
    pub const fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// # Errors
    ///
    /// Returns [`ImportError::InvalidConfig`] for zero sizes or a batch larger
    /// than a chunk.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.chunk_size == 0 || self.batch_size == 0 {
            return Err(ImportError::InvalidConfig(
                "chunk_size and batch_size must be greater than zero".into(),
            ));
        }
        if self.batch_size > self.chunk_size {
            return Err(ImportError::InvalidConfig(format!(
                "batch_size {} exceeds chunk_size {}",
                self.batch_size, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_map_onto_config() {
        let import = ImportSettings {
            chunk_size: 50,
            batch_size: 25,
            dedup: false,
        };
        let source = SourceConfig {
            buffer_bytes: 1024,
            max_record_bytes: 4096,
            ..SourceConfig::default()
        };
        let config = ImportConfig::from_settings(&import, &source);
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.batch_size, 25);
        assert!(!config.dedup);
        assert_eq!(config.decoder.max_record_bytes, 4096);
        config.validate().unwrap();
    }

    #[test]
    fn batch_larger_than_chunk_is_rejected() {
        let config = ImportConfig {
            chunk_size: 10,
            batch_size: 20,
            ..ImportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ImportError::InvalidConfig(_))));
    }
}
