//! Remote source configuration.

use serde::{Deserialize, Serialize};

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("conduit/{}", env!("CARGO_PKG_VERSION"))
}

/// Initial decoder buffer capacity (64 KiB).
const fn default_buffer_bytes() -> usize {
    64 * 1024
}

/// Longest single line the decoder will hold before discarding it (1 MiB).
const fn default_max_record_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Where sources live: an `http(s)://` base URL, or a local directory.
    #[serde(default)]
    pub base_url: String,

    /// Source identifiers imported when `cdt import` is given none.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Whole-request timeout for HTTP sources, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_buffer_bytes")]
    pub buffer_bytes: usize,

    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            sources: Vec::new(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            buffer_bytes: default_buffer_bytes(),
            max_record_bytes: default_max_record_bytes(),
        }
    }
}

impl SourceConfig {
    /// Check if a source location has been set.
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// Whether `base_url` points at an HTTP(S) endpoint rather than a directory.
    pub fn is_remote(&self) -> bool {
        let url = self.base_url.trim_start().to_ascii_lowercase();
        url.starts_with("http://") || url.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = SourceConfig::default();
        assert!(!config.is_configured());
        assert!(!config.is_remote());
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.buffer_bytes, 65_536);
        assert_eq!(config.max_record_bytes, 1_048_576);
        assert!(config.user_agent.starts_with("conduit/"));
    }

    #[test]
    fn remote_detection() {
        let mut config = SourceConfig {
            base_url: "HTTPS://data.example.com/inspections".into(),
            ..Default::default()
        };
        assert!(config.is_remote());

        config.base_url = "./data".into();
        assert!(config.is_configured());
        assert!(!config.is_remote());
    }
}
