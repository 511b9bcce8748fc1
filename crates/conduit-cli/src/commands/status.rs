use conduit_core::entities::ImportCheckpoint;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::StatusArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct StatusResponse {
    source_id: String,
    /// Whether `cdt import --resume` would continue this source.
    resumable: bool,
    latest: Option<ImportCheckpoint>,
}

/// Handle `cdt status`.
pub async fn handle(args: &StatusArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let latest = store.latest_checkpoint(&args.source).await?;
    let response = StatusResponse {
        source_id: args.source.clone(),
        resumable: latest.as_ref().is_some_and(ImportCheckpoint::is_resumable),
        latest,
    };
    output(&response, flags.format)
}
