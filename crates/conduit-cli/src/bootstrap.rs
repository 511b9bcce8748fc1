use std::path::Path;

use anyhow::Context;
use conduit_config::ConduitConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered config, then validate it.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<ConduitConfig> {
    load_dotenv()?;

    let config = ConduitConfig::load(flags.config.as_deref())
        .with_context(|| match flags.config.as_deref() {
            Some(path) => format!("failed to load config (including {})", path.display()),
            None => "failed to load config".to_string(),
        })?;
    config.validate().context("invalid configuration")?;
    tracing::debug!(
        base_url = %config.source.base_url,
        sources = config.source.sources.len(),
        store = %config.store.path,
        "configuration loaded"
    );
    Ok(config)
}

/// Read `.env` from the current directory when present. A missing file is
/// fine; a malformed one is an error.
fn load_dotenv() -> anyhow::Result<()> {
    let path = Path::new(".env");
    if path.exists() {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load dotenv file at {}", path.display()))?;
    }
    Ok(())
}
