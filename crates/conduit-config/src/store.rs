//! Structured store configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    ".conduit/conduit.db".to_string()
}

/// Page cache size in KiB (8 MiB).
const fn default_cache_size_kib() -> u32 {
    8 * 1024
}

const fn default_busy_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Database file path, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            cache_size_kib: default_cache_size_kib(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}
