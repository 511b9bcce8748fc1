//! Wire-format ingestion and JsonSchema validation tests for the entity types.

use chrono::Utc;
use conduit_core::entities::*;
use conduit_core::enums::*;
use conduit_core::filter::SearchFilter;
use conduit_core::progress::ImportProgress;
use conduit_core::raw::parse_line;
use conduit_core::responses::*;
use pretty_assertions::assert_eq;
use schemars::schema_for;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! conforms_to_schema {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;
            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

const SAMPLE_LINE: &str = r#"{"id":"INS-000001","timestamp":"2024-03-01T10:00:00Z",
 "location":{"city":"Houston","state":"TX","street":"1 Main St","zip":"77002","latitude":29.7,"longitude":-95.3},
 "pipe":{"material":"PVC","diameter_inches":12.0,"length_feet":310.0,"install_year":1985,"segment_id":"SEG-9","lining":"none"},
 "inspection_score":80.0,"requires_repair":false,
 "defects":[{"type":"crack","severity":"moderate","position_feet":12.5,"description":"hairline"}],
 "conditions":{"weather":"clear","flow_level_pct":35.0},
 "sensor_data":{"device_id":"CAM-7","readings":{}},
 "crew":{"lead":"J. Ortiz","team_size":3}}"#;

fn sample_record() -> InspectionRecord {
    parse_line(0, SAMPLE_LINE).unwrap().validate().unwrap()
}

#[test]
fn validated_record_survives_serde() {
    let record = sample_record();
    assert_eq!(
        record.pipe.extra.get("lining"),
        Some(&serde_json::Value::String("none".into()))
    );
    let json = serde_json::to_string(&record).unwrap();
    let recovered: InspectionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, record);
}

conforms_to_schema!(inspection_schema, InspectionRecord, sample_record());

conforms_to_schema!(
    checkpoint_schema,
    ImportCheckpoint,
    ImportCheckpoint {
        id: "imp-a3f8b2c1".into(),
        source_id: "inspections-001.jsonl".into(),
        started_at: Utc::now(),
        completed_at: Some(Utc::now()),
        records_processed: 1200,
        records_imported: 1187,
        errors: 13,
        status: CheckpointStatus::Completed,
        error_message: None,
    }
);

conforms_to_schema!(
    progress_schema,
    ImportProgress,
    ImportProgress::running(
        "inspections-001.jsonl",
        "imp-a3f8b2c1",
        CheckpointCounters::default(),
        Utc::now()
    )
);

conforms_to_schema!(filter_schema, SearchFilter, SearchFilter::default());

conforms_to_schema!(
    search_page_schema,
    SearchPage,
    SearchPage {
        results: vec![sample_record()],
        total_count: 41,
        page: 1,
        page_size: 20,
        backend: SearchBackendKind::Streaming,
        count_exact: false,
    }
);

conforms_to_schema!(
    summary_schema,
    StoreSummary,
    StoreSummary {
        total_inspections: 2,
        total_defects: 1,
        requires_repair: 1,
        average_score: Some(65.0),
        min_score: Some(50.0),
        max_score: Some(80.0),
        by_state: vec![GroupCount {
            key: "TX".into(),
            count: 2
        }],
        by_material: vec![],
        defects_by_severity: vec![],
    }
);

#[test]
fn search_page_reports_more_pages() {
    let page = SearchPage {
        results: vec![sample_record()],
        total_count: 3,
        page: 2,
        page_size: 1,
        backend: SearchBackendKind::Indexed,
        count_exact: true,
    };
    assert!(page.has_more());
    let last = SearchPage { page: 3, ..page };
    assert!(!last.has_more());
}
