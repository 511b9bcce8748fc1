use conduit_core::entities::{ImportCheckpoint, InspectionRecord};
use conduit_core::progress::ImportProgress;
use conduit_core::responses::SearchPage;
use schemars::schema_for;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{SchemaArgs, SchemaType};
use crate::output::output;

/// Handle `cdt schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&schema_json(args.type_name)?, flags.format)
}

fn schema_json(kind: SchemaType) -> anyhow::Result<serde_json::Value> {
    let schema = match kind {
        SchemaType::Inspection => schema_for!(InspectionRecord),
        SchemaType::Checkpoint => schema_for!(ImportCheckpoint),
        SchemaType::Progress => schema_for!(ImportProgress),
        SchemaType::SearchPage => schema_for!(SearchPage),
    };
    Ok(serde_json::to_value(schema)?)
}
