//! Result shapes returned by search and store queries, and printed as JSON by
//! `cdt search`, `cdt stats` and `cdt check`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::InspectionRecord;
use crate::enums::SearchBackendKind;

/// One page of search results.
///
/// `total_count` is exact when `count_exact` is set (indexed backend, or a
/// streaming scan that exhausted every source) and an estimate otherwise. It
/// is never smaller than the number of matches the backend actually saw.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SearchPage {
    pub results: Vec<InspectionRecord>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub backend: SearchBackendKind,
    pub count_exact: bool,
}

impl SearchPage {
    /// Whether a later page could hold more results.
    #[must_use]
    pub fn has_more(&self) -> bool {
        let seen = u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
            + self.results.len() as u64;
        self.total_count > seen
    }
}

/// A label and the number of rows carrying it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct GroupCount {
    pub key: String,
    pub count: u64,
}

/// Aggregates over the whole store, from `cdt stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct StoreSummary {
    pub total_inspections: u64,
    pub total_defects: u64,
    pub requires_repair: u64,
    pub average_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub by_state: Vec<GroupCount>,
    pub by_material: Vec<GroupCount>,
    pub defects_by_severity: Vec<GroupCount>,
}

/// Store integrity report, from `cdt check`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IntegrityReport {
    pub inspections: u64,
    pub defects: u64,
    pub orphan_defects: u64,
    pub checkpoints: u64,
    pub ok: bool,
}
