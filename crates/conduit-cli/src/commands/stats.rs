use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `cdt stats`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let summary = ctx.store().await?.summary().await?;
    output(&summary, flags.format)
}
