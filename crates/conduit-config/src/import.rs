//! Batch importer configuration.

use serde::{Deserialize, Serialize};

/// Lines decoded per chunk.
const fn default_chunk_size() -> u32 {
    200
}

/// Lines committed per transaction.
const fn default_batch_size() -> u32 {
    100
}

const fn default_dedup() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Skip records whose identifier is already stored.
    #[serde(default = "default_dedup")]
    pub dedup: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            batch_size: default_batch_size(),
            dedup: default_dedup(),
        }
    }
}
