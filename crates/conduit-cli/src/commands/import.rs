use anyhow::Context;
use conduit_core::enums::CheckpointStatus;
use conduit_import::{ImportConfig, ImportManager, ImportReport, Importer};

use crate::cli::root_commands::ImportArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::context::AppContext;
use crate::output::output;
use crate::progress::{Progress, describe};

/// Handle `cdt import`.
///
/// Runs inline through an [`ImportManager`]. Ctrl-C raises the stop signal,
/// so an interrupted run ends `paused` at a batch boundary and can be resumed.
pub async fn handle(args: &ImportArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let sources = ctx.source_ids(&args.sources)?;
    let store = ctx.store().await?;
    let source = ctx.source()?;
    let config = ImportConfig::from_settings(&ctx.config.import, &ctx.config.source)
        .with_dedup(!args.no_dedup);
    let manager = ImportManager::new(
        Importer::new(store, source, config).context("invalid import configuration")?,
    );

    let progress = Progress::spinner(if args.resume { "resuming import" } else { "importing" });
    let follower = progress.follow(manager.subscribe());
    let stop = manager.stop_signal();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; pausing after the current batch");
            stop.stop();
        }
    });

    let result = manager.run(&sources, args.resume).await;
    interrupt.abort();
    follower.abort();
    let report = result.context("import could not start")?;

    finish_progress(&progress, &report);
    print_report(&report, flags.format)?;

    if report.status() == CheckpointStatus::Failed {
        let reason = report
            .aborted
            .as_ref()
            .map(|a| format!("{}: {}", a.source_id, a.error))
            .or_else(|| {
                report
                    .sources
                    .last()
                    .and_then(|p| p.error_message.clone().map(|m| format!("{}: {m}", p.source_id)))
            })
            .unwrap_or_else(|| "unknown error".to_string());
        anyhow::bail!("import failed ({reason})");
    }
    Ok(())
}

fn finish_progress(progress: &Progress, report: &ImportReport) {
    let summary = report.sources.last().map_or_else(
        || format!("{} sources skipped", report.skipped.len()),
        describe,
    );
    match report.status() {
        CheckpointStatus::Failed => progress.finish_err(&summary),
        CheckpointStatus::Paused => progress.finish_ok(&format!("{summary} (paused; rerun with --resume)")),
        _ => progress.finish_ok(&summary),
    }
}

/// Lists print per source; JSON formats get the whole report.
fn print_report(report: &ImportReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Jsonl => output(&report.sources, format),
        OutputFormat::Json | OutputFormat::Raw => output(report, format),
    }
}
