//! Entity structs for all Conduit domain objects.
//!
//! `InspectionRecord` and `DefectRecord` map to the `inspections` and `defects`
//! tables; `ImportCheckpoint` maps to `import_checkpoints`. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema`.

mod checkpoint;
mod inspection;

pub use checkpoint::{CheckpointCounters, ImportCheckpoint};
pub use inspection::{
    Conditions, CrewInfo, DefectRecord, InspectionRecord, LocationDetail, PipeDetail, SensorData,
};
