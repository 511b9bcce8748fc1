use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Import(args) => commands::import::handle(&args, ctx, flags).await,
        Commands::Search(args) => commands::search::handle(&args, ctx, flags).await,
        Commands::History(args) => commands::history::handle(&args, ctx, flags).await,
        Commands::Status(args) => commands::status::handle(&args, ctx, flags).await,
        Commands::Stats => commands::stats::handle(ctx, flags).await,
        Commands::Check => commands::check::handle(ctx, flags).await,
        Commands::Schema(args) => commands::schema::handle(&args, flags),
    }
}
