use clap::{Args, Subcommand, ValueEnum};
use conduit_search::BackendChoice;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Import sources into the store (resumable).
    Import(ImportArgs),
    /// Filtered, paginated search over inspections.
    Search(SearchArgs),
    /// Import run history from the checkpoint ledger.
    History(HistoryArgs),
    /// Latest import run for one source, and whether it can be resumed.
    Status(StatusArgs),
    /// Store-wide aggregates.
    Stats,
    /// Integrity report: row counts and orphaned defects.
    Check,
    /// Print a JSON Schema for a record type.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ImportArgs {
    /// Source identifiers (defaults to `source.sources` from config).
    pub sources: Vec<String>,

    /// Continue each source from its last paused or failed run.
    #[arg(long)]
    pub resume: bool,

    /// Re-write records whose ids are already stored.
    #[arg(long)]
    pub no_dedup: bool,
}

#[derive(Clone, Debug, Args)]
pub struct SearchArgs {
    /// City substring (case-insensitive).
    #[arg(long)]
    pub city: Option<String>,

    /// State, exact match (case-insensitive).
    #[arg(long)]
    pub state: Option<String>,

    /// Pipe material substring (case-insensitive).
    #[arg(long)]
    pub material: Option<String>,

    /// Minimum inspection score (inclusive).
    #[arg(long)]
    pub score_min: Option<f64>,

    /// Maximum inspection score (inclusive).
    #[arg(long)]
    pub score_max: Option<f64>,

    /// Only records whose repair flag equals this value.
    #[arg(long)]
    pub requires_repair: Option<bool>,

    /// 1-based page number.
    #[arg(long)]
    pub page: Option<u32>,

    /// Results per page (defaults to `search.default_page_size`).
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Search backend: auto, indexed, streaming.
    #[arg(long, default_value = "auto")]
    pub backend: BackendChoice,

    /// Sources for the streaming backend (defaults to `source.sources`).
    #[arg(long = "source")]
    pub sources: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct HistoryArgs {
    /// Only runs for this source.
    #[arg(long)]
    pub source: Option<String>,

    /// Max runs to list.
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

#[derive(Clone, Debug, Args)]
pub struct StatusArgs {
    /// Source identifier.
    pub source: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum SchemaType {
    /// A stored inspection with its defects.
    #[default]
    Inspection,
    /// A checkpoint ledger row.
    Checkpoint,
    /// An import progress snapshot.
    Progress,
    /// A search results page.
    SearchPage,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Record type to describe.
    #[arg(value_enum, default_value = "inspection")]
    pub type_name: SchemaType,
}
