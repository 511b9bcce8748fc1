//! # conduit-config
//!
//! Layered configuration loading for Conduit using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CONDUIT_*` prefix, `__` as separator)
//! 2. An explicit file passed with `cdt --config <path>`
//! 3. Project-level `.conduit/config.toml`
//! 4. User-level `~/.config/conduit/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `CONDUIT_SOURCE__BASE_URL` -> `source.base_url`,
//! `CONDUIT_IMPORT__BATCH_SIZE` -> `import.batch_size`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use conduit_config::ConduitConfig;
//!
//! let config = ConduitConfig::load_with_dotenv(None).expect("config");
//! config.validate().expect("valid config");
//!
//! if config.source.is_configured() {
//!     println!("sources at {}", config.source.base_url);
//! }
//! ```

mod error;
mod import;
mod search;
mod source;
mod store;

pub use error::ConfigError;
pub use import::ImportSettings;
pub use search::SearchConfig;
pub use source::SourceConfig;
pub use store::StoreConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConduitConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub import: ImportSettings,
    #[serde(default)]
    pub search: SearchConfig,
}

impl ConduitConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `explicit` does not exist, or
    /// [`ConfigError::Figment`] if any layer fails to parse or extract.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            return Err(ConfigError::invalid(
                "config",
                format!("no such file: {}", path.display()),
            ));
        }
        Self::figment(explicit).extract().map_err(ConfigError::from)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if any layer fails to parse or extract.
    pub fn load_with_dotenv(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(explicit)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".conduit/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("CONDUIT_").split("__"))
    }

    /// Reject values the importer, decoder or search engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero: [(&str, u64); 7] = [
            ("import.chunk_size", u64::from(self.import.chunk_size)),
            ("import.batch_size", u64::from(self.import.batch_size)),
            ("source.buffer_bytes", self.source.buffer_bytes as u64),
            ("source.max_record_bytes", self.source.max_record_bytes as u64),
            ("search.default_page_size", u64::from(self.search.default_page_size)),
            ("search.max_page_size", u64::from(self.search.max_page_size)),
            ("search.sample_size", u64::from(self.search.sample_size)),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::invalid(field, "must be greater than zero"));
        }
        if self.import.batch_size > self.import.chunk_size {
            return Err(ConfigError::invalid(
                "import.batch_size",
                format!(
                    "batch size {} exceeds chunk size {}",
                    self.import.batch_size, self.import.chunk_size
                ),
            ));
        }
        if self.search.default_page_size > self.search.max_page_size {
            return Err(ConfigError::invalid(
                "search.default_page_size",
                "must not exceed search.max_page_size",
            ));
        }
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::invalid("store.path", "must not be empty"));
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("conduit").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ConduitConfig::default();
        assert!(!config.source.is_configured());
        assert_eq!(config.import.chunk_size, 200);
        assert_eq!(config.import.batch_size, 100);
        assert!(config.import.dedup);
        assert_eq!(config.search.sample_size, 500);
        assert_eq!(config.store.cache_size_kib, 8192);
        config.validate().expect("defaults validate");
    }

    #[test]
    fn batch_larger_than_chunk_is_rejected() {
        let mut config = ConduitConfig::default();
        config.import.batch_size = 500;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "import.batch_size")
        );
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let mut config = ConduitConfig::default();
        config.search.sample_size = 0;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "search.sample_size")
        );
    }
}
