//! The search filter shared by both search backends.
//!
//! The in-memory predicate ([`SearchFilter::matches`]) mirrors the SQL the
//! indexed backend emits: `city`/`material` are ASCII case-insensitive
//! substring matches (SQLite `LIKE`), `state` is an ASCII case-insensitive
//! exact match (`COLLATE NOCASE`), score bounds are inclusive, and the repair
//! flag is exact equality when present.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::InspectionRecord;
use crate::errors::CoreError;

/// Default page size when a caller does not provide one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Hard ceiling on `page_size` when no configured maximum is supplied.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Filter and pagination for one search request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SearchFilter {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub score_min: Option<f64>,
    #[serde(default)]
    pub score_max: Option<f64>,
    #[serde(default)]
    pub requires_repair: Option<bool>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            city: None,
            state: None,
            material: None,
            score_min: None,
            score_max: None,
            requires_repair: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl SearchFilter {
    /// Trim string predicates (blank means absent), clamp `page` to at least 1
    /// and `page_size` to `[1, max_page_size]`.
    #[must_use]
    pub fn normalized(mut self, max_page_size: u32) -> Self {
        self.city = trimmed(self.city);
        self.state = trimmed(self.state);
        self.material = trimmed(self.material);
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, max_page_size.max(1));
        self
    }

    /// Reject filters that can never match anything meaningful.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for non-finite score bounds or when
    /// `score_min > score_max`.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, bound) in [("score_min", self.score_min), ("score_max", self.score_max)] {
            if bound.is_some_and(|b| !b.is_finite()) {
                return Err(CoreError::Validation(format!("{name} must be a finite number")));
            }
        }
        if let (Some(min), Some(max)) = (self.score_min, self.score_max)
            && min > max
        {
            return Err(CoreError::Validation(format!(
                "score_min ({min}) is greater than score_max ({max})"
            )));
        }
        Ok(())
    }

    /// Number of matches that precede this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Whether any predicate is set.
    #[must_use]
    pub const fn has_predicates(&self) -> bool {
        self.city.is_some()
            || self.state.is_some()
            || self.material.is_some()
            || self.score_min.is_some()
            || self.score_max.is_some()
            || self.requires_repair.is_some()
    }

    /// Apply the filter predicate to a decoded record.
    #[must_use]
    pub fn matches(&self, record: &InspectionRecord) -> bool {
        if let Some(city) = self.city.as_deref()
            && !contains_ignore_ascii_case(record.city(), city)
        {
            return false;
        }
        if let Some(state) = self.state.as_deref()
            && !record.state().eq_ignore_ascii_case(state)
        {
            return false;
        }
        if let Some(material) = self.material.as_deref()
            && !contains_ignore_ascii_case(record.material(), material)
        {
            return false;
        }
        if self.score_min.is_some_and(|min| record.score < min) {
            return false;
        }
        if self.score_max.is_some_and(|max| record.score > max) {
            return false;
        }
        self.requires_repair
            .is_none_or(|flag| record.requires_repair == flag)
    }
}

/// ASCII case-insensitive substring test, matching SQLite `LIKE` folding.
#[must_use]
pub fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let (h, n) = (haystack.as_bytes(), needle.as_bytes());
    h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
}

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::raw::parse_line;

    fn record(city: &str, state: &str, material: &str, score: f64, repair: bool) -> InspectionRecord {
        let line = serde_json::json!({
            "id": "r-1",
            "location": {"city": city, "state": state},
            "pipe": {"material": material},
            "inspection_score": score,
            "requires_repair": repair,
        })
        .to_string();
        parse_line(0, &line).unwrap().validate().unwrap()
    }

    #[rstest]
    #[case::city_lowercase(SearchFilter { city: Some("houston".into()), ..Default::default() }, true)]
    #[case::city_substring(SearchFilter { city: Some("OUST".into()), ..Default::default() }, true)]
    #[case::city_miss(SearchFilter { city: Some("dallas".into()), ..Default::default() }, false)]
    #[case::state_exact(SearchFilter { state: Some("tx".into()), ..Default::default() }, true)]
    #[case::state_not_substring(SearchFilter { state: Some("t".into()), ..Default::default() }, false)]
    #[case::material(SearchFilter { material: Some("pv".into()), ..Default::default() }, true)]
    #[case::score_inclusive(SearchFilter { score_min: Some(80.0), score_max: Some(80.0), ..Default::default() }, true)]
    #[case::score_above(SearchFilter { score_min: Some(90.0), ..Default::default() }, false)]
    #[case::repair_eq(SearchFilter { requires_repair: Some(false), ..Default::default() }, true)]
    #[case::repair_ne(SearchFilter { requires_repair: Some(true), ..Default::default() }, false)]
    #[case::unconstrained(SearchFilter::default(), true)]
    fn predicate_semantics(#[case] filter: SearchFilter, #[case] expected: bool) {
        let r = record("Houston", "TX", "PVC", 80.0, false);
        assert_eq!(filter.matches(&r), expected);
    }

    #[test]
    fn wildcard_characters_are_literal() {
        let r = record("Houston", "TX", "PVC", 80.0, false);
        let filter = SearchFilter {
            city: Some("%".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
        assert!(filter.matches(&record("100% City", "TX", "PVC", 1.0, true)));
    }

    #[test]
    fn normalization_clamps_and_trims() {
        let filter = SearchFilter {
            city: Some("   ".into()),
            state: Some(" tx ".into()),
            page: 0,
            page_size: 5000,
            ..Default::default()
        }
        .normalized(100);
        assert_eq!(filter.city, None);
        assert_eq!(filter.state.as_deref(), Some("tx"));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 100);
        assert_eq!(filter.offset(), 0);

        let zero = SearchFilter {
            page_size: 0,
            page: 3,
            ..Default::default()
        }
        .normalized(100);
        assert_eq!(zero.page_size, 1);
        assert_eq!(zero.offset(), 2);
    }

    #[test]
    fn inverted_score_range_is_rejected() {
        let filter = SearchFilter {
            score_min: Some(90.0),
            score_max: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(filter.validate(), Err(CoreError::Validation(_))));
        let nan = SearchFilter {
            score_min: Some(f64::NAN),
            ..Default::default()
        };
        assert!(nan.validate().is_err());
        assert!(SearchFilter::default().validate().is_ok());
    }
}
