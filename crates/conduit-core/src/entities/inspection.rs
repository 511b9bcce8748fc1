use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated pipe inspection.
///
/// The filterable scalars (city, state, material, score, repair flag) are
/// guaranteed present. Everything else is optional detail that the store keeps
/// as structured blobs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct InspectionRecord {
    pub id: String,
    pub inspected_at: Option<DateTime<Utc>>,
    pub location: LocationDetail,
    pub pipe: PipeDetail,
    pub score: f64,
    pub requires_repair: bool,
    #[serde(default)]
    pub defects: Vec<DefectRecord>,
    pub conditions: Option<Conditions>,
    pub sensor_data: Option<SensorData>,
    pub crew: Option<CrewInfo>,
}

impl InspectionRecord {
    #[must_use]
    pub fn city(&self) -> &str {
        &self.location.city
    }

    #[must_use]
    pub fn state(&self) -> &str {
        &self.location.state
    }

    #[must_use]
    pub fn material(&self) -> &str {
        &self.pipe.material
    }
}

/// Where the inspected segment is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LocationDetail {
    pub city: String,
    pub state: String,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// Physical properties of the inspected pipe.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PipeDetail {
    pub material: String,
    pub diameter_inches: Option<f64>,
    pub length_feet: Option<f64>,
    pub install_year: Option<i32>,
    pub segment_id: Option<String>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// One defect observed during an inspection. Owned by its parent record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DefectRecord {
    #[serde(rename = "type")]
    pub defect_type: String,
    pub severity: Option<String>,
    pub position_feet: Option<f64>,
    pub description: Option<String>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// Site conditions at inspection time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Conditions {
    pub weather: Option<String>,
    pub temperature_f: Option<f64>,
    pub flow_level_pct: Option<f64>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// Instrument metadata. Readings are carried without interpretation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SensorData {
    pub device_id: Option<String>,
    pub readings: Option<Value>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// Who performed the inspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CrewInfo {
    pub lead: Option<String>,
    pub team_size: Option<u32>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}
