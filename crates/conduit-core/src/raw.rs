//! The wire shape of one source line and its validation into a typed record.
//!
//! Sources are loosely typed: every field may be absent, identifiers and zip
//! codes show up as either strings or numbers, and a handful of keys have
//! historical aliases. `RawInspection` accepts all of that; `validate()` is the
//! single ingestion boundary that turns it into an [`InspectionRecord`] or a
//! [`RecordValidationError`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::entities::{
    Conditions, CrewInfo, DefectRecord, InspectionRecord, LocationDetail, PipeDetail, SensorData,
};
use crate::errors::{RecordParseError, RecordValidationError};

/// A source line as it arrives, before any field is required.
///
/// Required fields keep their JSON types strictly. Optional fields are read as
/// raw values and coerced in [`RawInspection::validate`]; a value that cannot
/// be coerced is kept in the owning group's `extra` map instead of failing the
/// whole line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInspection {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, alias = "inspected_at", alias = "inspection_date")]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub pipe: Option<RawPipe>,
    #[serde(default, alias = "score")]
    pub inspection_score: Option<f64>,
    #[serde(default, alias = "repair_required")]
    pub requires_repair: Option<bool>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub defects: Option<Vec<RawDefect>>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub conditions: Option<RawConditions>,
    #[serde(default, alias = "sensor", deserialize_with = "lenient_group")]
    pub sensor_data: Option<RawSensorData>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub crew: Option<RawCrew>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub street: Option<Value>,
    #[serde(default)]
    pub zip: Option<Value>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<Value>,
    #[serde(default, alias = "lon", alias = "lng")]
    pub longitude: Option<Value>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPipe {
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default, alias = "diameter_in")]
    pub diameter_inches: Option<Value>,
    #[serde(default, alias = "length_ft")]
    pub length_feet: Option<Value>,
    #[serde(default)]
    pub install_year: Option<Value>,
    #[serde(default)]
    pub segment_id: Option<Value>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDefect {
    #[serde(default, rename = "type", alias = "defect_type")]
    pub defect_type: Option<Value>,
    #[serde(default)]
    pub severity: Option<Value>,
    #[serde(default, alias = "position_ft")]
    pub position_feet: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConditions {
    #[serde(default)]
    pub weather: Option<Value>,
    #[serde(default)]
    pub temperature_f: Option<Value>,
    #[serde(default)]
    pub flow_level_pct: Option<Value>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSensorData {
    #[serde(default)]
    pub device_id: Option<Value>,
    #[serde(default)]
    pub readings: Option<Value>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCrew {
    #[serde(default)]
    pub lead: Option<Value>,
    #[serde(default)]
    pub team_size: Option<Value>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// Parse one source line into its raw shape.
///
/// # Errors
///
/// Returns [`RecordParseError`] if the line is not a JSON object of the
/// expected shape.
pub fn parse_line(ordinal: u64, line: &str) -> Result<RawInspection, RecordParseError> {
    serde_json::from_str(line).map_err(|e| RecordParseError::new(ordinal, e.to_string()))
}

impl RawInspection {
    /// Check required fields and build the typed record.
    ///
    /// Required, in order: `id`, `location.city`, `location.state`,
    /// `pipe.material`, `inspection_score`, `requires_repair`. Blank strings
    /// count as missing and a non-finite score counts as missing.
    ///
    /// # Errors
    ///
    /// Returns [`RecordValidationError`] naming the first missing field.
    pub fn validate(self) -> Result<InspectionRecord, RecordValidationError> {
        let id = non_blank(self.id);
        let missing = |field: &'static str| RecordValidationError {
            id: id.clone(),
            field,
        };

        let Some(record_id) = id.clone() else {
            return Err(missing("id"));
        };
        let location = self.location.unwrap_or_default();
        let city = non_blank(location.city).ok_or_else(|| missing("location.city"))?;
        let state = non_blank(location.state).ok_or_else(|| missing("location.state"))?;
        let pipe = self.pipe.unwrap_or_default();
        let material = non_blank(pipe.material).ok_or_else(|| missing("pipe.material"))?;
        let score = self
            .inspection_score
            .filter(|s| s.is_finite())
            .ok_or_else(|| missing("inspection_score"))?;
        let requires_repair = self
            .requires_repair
            .ok_or_else(|| missing("requires_repair"))?;

        let defects = self
            .defects
            .unwrap_or_default()
            .into_iter()
            .map(RawDefect::into_record)
            .collect();

        let mut location_extra = location.extra;
        let mut pipe_extra = pipe.extra;
        Ok(InspectionRecord {
            id: record_id,
            inspected_at: self
                .timestamp
                .as_ref()
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            location: LocationDetail {
                city,
                state,
                street: coerce_string(&mut location_extra, "street", location.street),
                zip: coerce_string(&mut location_extra, "zip", location.zip),
                latitude: coerce_f64(&mut location_extra, "latitude", location.latitude),
                longitude: coerce_f64(&mut location_extra, "longitude", location.longitude),
                extra: location_extra,
            },
            pipe: PipeDetail {
                material,
                diameter_inches: coerce_f64(&mut pipe_extra, "diameter_inches", pipe.diameter_inches),
                length_feet: coerce_f64(&mut pipe_extra, "length_feet", pipe.length_feet),
                install_year: coerce_int(&mut pipe_extra, "install_year", pipe.install_year),
                segment_id: coerce_string(&mut pipe_extra, "segment_id", pipe.segment_id),
                extra: pipe_extra,
            },
            score,
            requires_repair,
            defects,
            conditions: self.conditions.map(RawConditions::into_conditions),
            sensor_data: self.sensor_data.map(RawSensorData::into_sensor_data),
            crew: self.crew.map(RawCrew::into_crew),
        })
    }
}

impl RawDefect {
    fn into_record(self) -> DefectRecord {
        let mut extra = self.extra;
        DefectRecord {
            defect_type: non_blank(coerce_string(&mut extra, "type", self.defect_type))
                .unwrap_or_else(|| "unknown".to_string()),
            severity: non_blank(coerce_string(&mut extra, "severity", self.severity)),
            position_feet: coerce_f64(&mut extra, "position_feet", self.position_feet),
            description: coerce_string(&mut extra, "description", self.description),
            extra,
        }
    }
}

impl RawConditions {
    fn into_conditions(self) -> Conditions {
        let mut extra = self.extra;
        Conditions {
            weather: coerce_string(&mut extra, "weather", self.weather),
            temperature_f: coerce_f64(&mut extra, "temperature_f", self.temperature_f),
            flow_level_pct: coerce_f64(&mut extra, "flow_level_pct", self.flow_level_pct),
            extra,
        }
    }
}

impl RawSensorData {
    fn into_sensor_data(self) -> SensorData {
        let mut extra = self.extra;
        SensorData {
            device_id: coerce_string(&mut extra, "device_id", self.device_id),
            readings: self.readings,
            extra,
        }
    }
}

impl RawCrew {
    fn into_crew(self) -> CrewInfo {
        let mut extra = self.extra;
        CrewInfo {
            lead: coerce_string(&mut extra, "lead", self.lead),
            team_size: coerce_int(&mut extra, "team_size", self.team_size),
            extra,
        }
    }
}

/// Keep a value that could not be coerced under its own key.
fn keep(extra: &mut Map<String, Value>, key: &str, value: Value) {
    if !value.is_null() {
        extra.insert(key.to_string(), value);
    }
}

/// Strings pass through; numbers and booleans are stringified.
fn coerce_string(extra: &mut Map<String, Value>, key: &str, value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            keep(extra, key, other);
            None
        }
    }
}

/// Numbers and numeric strings.
fn coerce_f64(extra: &mut Map<String, Value>, key: &str, value: Option<Value>) -> Option<f64> {
    let value = value?;
    let coerced = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite());
    if coerced.is_none() {
        keep(extra, key, value);
    }
    coerced
}

/// Integers, integral floats (`1985.0`) and integer strings that fit `T`.
fn coerce_int<T: TryFrom<i64>>(
    extra: &mut Map<String, Value>,
    key: &str,
    value: Option<Value>,
) -> Option<T> {
    let value = value?;
    let whole = |f: f64| {
        #[allow(clippy::cast_possible_truncation)]
        let i = f as i64;
        (f.fract() == 0.0 && f.is_finite()).then_some(i)
    };
    let coerced = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    }
    .and_then(|i| T::try_from(i).ok());
    if coerced.is_none() {
        keep(extra, key, value);
    }
    coerced
}

/// Parse an inspection timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (assumed UTC)
/// and bare dates. Anything else is dropped; the timestamp is not required.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}

/// An optional object group; anything other than an object reads as absent.
fn lenient_group<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// An optional list of object groups; non-object elements are dropped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}
