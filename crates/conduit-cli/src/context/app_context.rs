use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use conduit_config::ConduitConfig;
use conduit_db::{LazyStore, Store, StoreOptions};
use conduit_source::{AnySource, DecoderConfig};

/// Shared application resources. The store opens on first use.
pub struct AppContext {
    pub config: ConduitConfig,
    store: LazyStore,
}

impl AppContext {
    pub fn new(config: ConduitConfig) -> Self {
        let store = LazyStore::new(
            config.store.path.clone(),
            StoreOptions::from(&config.store),
        );
        Self { config, store }
    }

    /// Open (or reuse) the store, creating its parent directory if needed.
    pub async fn store(&self) -> anyhow::Result<Arc<Store>> {
        if !self.config.store.is_in_memory()
            && let Some(parent) = Path::new(&self.config.store.path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }
        self.store
            .get()
            .await
            .with_context(|| format!("failed to open store at {}", self.config.store.path))
    }

    /// The store, only if it already exists on disk. Never creates one.
    pub async fn existing_store(&self) -> anyhow::Result<Option<Arc<Store>>> {
        if self.store.is_open() || Path::new(&self.config.store.path).is_file() {
            return self.store().await.map(Some);
        }
        Ok(None)
    }

    /// The configured byte source.
    pub fn source(&self) -> anyhow::Result<AnySource> {
        AnySource::from_config(&self.config.source)
            .context("no usable source configured (set source.base_url or CONDUIT_SOURCE__BASE_URL)")
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            buffer_bytes: self.config.source.buffer_bytes,
            max_record_bytes: self.config.source.max_record_bytes,
        }
    }

    /// `explicit` if given, else the configured source list.
    pub fn source_ids(&self, explicit: &[String]) -> anyhow::Result<Vec<String>> {
        let ids = if explicit.is_empty() {
            self.config.source.sources.clone()
        } else {
            explicit.to_vec()
        };
        if ids.is_empty() {
            anyhow::bail!("no sources given and source.sources is empty");
        }
        Ok(ids)
    }

    /// Release the store connection, if one was opened.
    pub fn close(&mut self) {
        if self.store.close() {
            tracing::debug!(path = self.store.path(), "store closed");
        }
    }
}
