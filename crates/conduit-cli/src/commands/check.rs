use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `cdt check`. Fails after printing the report if it found problems.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = ctx.store().await?.integrity_report().await?;
    output(&report, flags.format)?;
    if !report.ok {
        anyhow::bail!(
            "integrity check failed: {} defect rows reference missing inspections",
            report.orphan_defects
        );
    }
    Ok(())
}
