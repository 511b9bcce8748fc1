use crate::cli::GlobalFlags;
use crate::cli::root_commands::HistoryArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `cdt history`.
pub async fn handle(args: &HistoryArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let checkpoints = store
        .list_checkpoints(args.source.as_deref(), args.limit)
        .await?;
    output(&checkpoints, flags.format)
}
