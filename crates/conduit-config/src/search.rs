//! Search engine configuration.

use serde::{Deserialize, Serialize};

const fn default_page_size() -> u32 {
    20
}

const fn default_max_page_size() -> u32 {
    100
}

/// Records sampled per source for the streaming count estimate.
const fn default_sample_size() -> u32 {
    500
}

/// Assumed records per source when the transport gives no size hint.
const fn default_assumed_source_records() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    #[serde(default = "default_sample_size")]
    pub sample_size: u32,

    #[serde(default = "default_assumed_source_records")]
    pub assumed_source_records: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            sample_size: default_sample_size(),
            assumed_source_records: default_assumed_source_records(),
        }
    }
}
