use conduit_core::filter::SearchFilter;
use conduit_core::responses::SearchPage;
use conduit_search::{
    BackendChoice, IndexedBackend, ScanOptions, SearchEngine, StreamingBackend,
};
use conduit_source::AnySource;
use serde::Serialize;

use crate::cli::root_commands::SearchArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::context::AppContext;
use crate::output::output;

/// Compact row for table output.
#[derive(Debug, Serialize)]
struct SearchRow<'a> {
    id: &'a str,
    inspected_at: Option<String>,
    city: &'a str,
    state: &'a str,
    material: &'a str,
    score: f64,
    requires_repair: bool,
    defects: usize,
}

/// Handle `cdt search`.
pub async fn handle(args: &SearchArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let filter = build_filter(args, ctx.config.search.default_page_size);
    let engine = build_engine(args, ctx).await?;
    let page = engine.search(&filter, args.backend).await?;
    tracing::info!(
        backend = %page.backend,
        returned = page.results.len(),
        total = page.total_count,
        exact = page.count_exact,
        "search finished"
    );
    print_page(&page, flags.format)
}

fn build_filter(args: &SearchArgs, default_page_size: u32) -> SearchFilter {
    SearchFilter {
        city: args.city.clone(),
        state: args.state.clone(),
        material: args.material.clone(),
        score_min: args.score_min,
        score_max: args.score_max,
        requires_repair: args.requires_repair,
        page: args.page.unwrap_or(1),
        page_size: args.page_size.unwrap_or(default_page_size),
    }
}

/// Configure only the backends `args.backend` may use. Under `auto` the
/// store joins only if it already exists, and streaming only if a source is
/// configured.
async fn build_engine(
    args: &SearchArgs,
    ctx: &AppContext,
) -> anyhow::Result<SearchEngine<AnySource>> {
    let max_page_size = ctx.config.search.max_page_size;
    let mut engine = SearchEngine::new();

    let store = match args.backend {
        BackendChoice::Indexed => Some(ctx.store().await?),
        BackendChoice::Auto => ctx.existing_store().await?,
        BackendChoice::Streaming => None,
    };
    if let Some(store) = store {
        engine = engine.with_indexed(IndexedBackend::new(store).with_max_page_size(max_page_size));
    }

    let want_streaming = match args.backend {
        BackendChoice::Streaming => true,
        BackendChoice::Auto => ctx.config.source.is_configured(),
        BackendChoice::Indexed => false,
    };
    if want_streaming {
        let backend = StreamingBackend::new(
            ctx.source()?,
            ctx.decoder_config(),
            ctx.source_ids(&args.sources)?,
        )
        .with_options(ScanOptions::from(&ctx.config.search));
        engine = engine.with_streaming(backend);
    }
    Ok(engine)
}

fn print_page(page: &SearchPage, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Raw => output(page, format),
        OutputFormat::Jsonl => output(&page.results, format),
        OutputFormat::Table => {
            let rows = page.results.iter().map(to_row).collect::<Vec<_>>();
            output(&rows, format)?;
            println!("{}", footer(page));
            Ok(())
        }
    }
}

fn to_row(record: &conduit_core::entities::InspectionRecord) -> SearchRow<'_> {
    SearchRow {
        id: &record.id,
        inspected_at: record.inspected_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
        city: record.city(),
        state: record.state(),
        material: record.material(),
        score: record.score,
        requires_repair: record.requires_repair,
        defects: record.defects.len(),
    }
}

fn footer(page: &SearchPage) -> String {
    let pages = page.total_count.div_ceil(u64::from(page.page_size.max(1))).max(1);
    let qualifier = if page.count_exact { "" } else { "~" };
    format!(
        "page {} of {qualifier}{pages} ({qualifier}{} matches, {} backend)",
        page.page, page.total_count, page.backend
    )
}

#[cfg(test)]
mod tests {
    use conduit_core::enums::SearchBackendKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn args() -> SearchArgs {
        SearchArgs {
            city: Some("houston".to_string()),
            state: None,
            material: None,
            score_min: Some(50.0),
            score_max: None,
            requires_repair: None,
            page: None,
            page_size: None,
            backend: BackendChoice::Auto,
            sources: Vec::new(),
        }
    }

    fn page(total_count: u64, count_exact: bool) -> SearchPage {
        SearchPage {
            results: Vec::new(),
            total_count,
            page: 2,
            page_size: 20,
            backend: SearchBackendKind::Streaming,
            count_exact,
        }
    }

    #[test]
    fn filter_uses_configured_default_page_size() {
        let filter = build_filter(&args(), 35);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 35);
        assert_eq!(filter.city.as_deref(), Some("houston"));
        assert_eq!(filter.score_min, Some(50.0));
    }

    #[test]
    fn footer_marks_estimates() {
        assert_eq!(
            footer(&page(41, true)),
            "page 2 of 3 (41 matches, streaming backend)"
        );
        assert_eq!(
            footer(&page(41, false)),
            "page 2 of ~3 (~41 matches, streaming backend)"
        );
    }

    #[test]
    fn footer_with_no_matches() {
        assert_eq!(
            footer(&page(0, true)),
            "page 2 of 1 (0 matches, streaming backend)"
        );
    }
}
