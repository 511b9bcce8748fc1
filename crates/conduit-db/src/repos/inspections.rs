//! Inspection repository.
//!
//! Upserts validated records with their defects, answers dedup lookups, and
//! runs the indexed filter query behind the search engine.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use conduit_core::entities::{DefectRecord, InspectionRecord};
use conduit_core::filter::SearchFilter;

use crate::Store;
use crate::error::{BatchWriteError, DatabaseError};
use crate::helpers::{
    count_param, format_datetime, get_count, get_opt_string, like_contains, parse_json,
    parse_optional_datetime, parse_optional_json, placeholders, to_json,
};

/// Bound parameters per `IN (...)` lookup.
const ID_LOOKUP_CHUNK: usize = 500;

const SELECT_INSPECTION: &str = "SELECT id, inspected_at, score, requires_repair, location_json, \
     pipe_json, conditions_json, sensor_json, crew_json FROM inspections";

/// Result of one [`Store::upsert_batch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteOutcome {
    /// Records inserted or replaced.
    pub written: u64,
    /// Records rolled back to their savepoint.
    pub failed: Vec<BatchWriteError>,
}

fn row_to_inspection(row: &libsql::Row) -> Result<InspectionRecord, DatabaseError> {
    let inspected_at_str = get_opt_string(row, 1)?;
    let conditions_str = get_opt_string(row, 6)?;
    let sensor_str = get_opt_string(row, 7)?;
    let crew_str = get_opt_string(row, 8)?;
    Ok(InspectionRecord {
        id: row.get::<String>(0)?,
        inspected_at: parse_optional_datetime(inspected_at_str.as_deref())?,
        score: row.get::<f64>(2)?,
        requires_repair: row.get::<i64>(3)? != 0,
        location: parse_json(&row.get::<String>(4)?)?,
        pipe: parse_json(&row.get::<String>(5)?)?,
        conditions: parse_optional_json(conditions_str.as_deref())?,
        sensor_data: parse_optional_json(sensor_str.as_deref())?,
        crew: parse_optional_json(crew_str.as_deref())?,
        defects: Vec::new(),
    })
}

fn row_to_defect(row: &libsql::Row) -> Result<(String, DefectRecord), DatabaseError> {
    let extra_str = get_opt_string(row, 5)?;
    Ok((
        row.get::<String>(0)?,
        DefectRecord {
            defect_type: row.get::<String>(1)?,
            severity: get_opt_string(row, 2)?,
            position_feet: row.get::<Option<f64>>(3)?,
            description: get_opt_string(row, 4)?,
            extra: parse_optional_json(extra_str.as_deref())?.unwrap_or_default(),
        },
    ))
}

fn optional_json<T: serde::Serialize>(value: Option<&T>) -> Result<libsql::Value, DatabaseError> {
    Ok(match value {
        Some(v) => to_json(v)?.into(),
        None => libsql::Value::Null,
    })
}

/// Insert or replace one record and its defects on `conn`.
async fn write_inspection(
    conn: &libsql::Connection,
    record: &InspectionRecord,
    source_id: &str,
    imported_at: &str,
) -> Result<(), DatabaseError> {
    let params: Vec<libsql::Value> = vec![
        record.id.as_str().into(),
        source_id.into(),
        record
            .inspected_at
            .as_ref()
            .map_or(libsql::Value::Null, |dt| format_datetime(dt).into()),
        record.city().into(),
        record.state().into(),
        record.material().into(),
        record.score.into(),
        i64::from(record.requires_repair).into(),
        to_json(&record.location)?.into(),
        to_json(&record.pipe)?.into(),
        optional_json(record.conditions.as_ref())?,
        optional_json(record.sensor_data.as_ref())?,
        optional_json(record.crew.as_ref())?,
        imported_at.into(),
    ];
    conn.execute(
        "INSERT INTO inspections
             (id, source_id, inspected_at, city, state, material, score, requires_repair,
              location_json, pipe_json, conditions_json, sensor_json, crew_json, imported_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
             source_id = excluded.source_id,
             inspected_at = excluded.inspected_at,
             city = excluded.city,
             state = excluded.state,
             material = excluded.material,
             score = excluded.score,
             requires_repair = excluded.requires_repair,
             location_json = excluded.location_json,
             pipe_json = excluded.pipe_json,
             conditions_json = excluded.conditions_json,
             sensor_json = excluded.sensor_json,
             crew_json = excluded.crew_json,
             imported_at = excluded.imported_at",
        libsql::params_from_iter(params),
    )
    .await?;

    conn.execute(
        "DELETE FROM defects WHERE inspection_id = ?1",
        [record.id.as_str()],
    )
    .await?;

    for (position, defect) in record.defects.iter().enumerate() {
        let extra = if defect.extra.is_empty() {
            libsql::Value::Null
        } else {
            to_json(&defect.extra)?.into()
        };
        let params: Vec<libsql::Value> = vec![
            record.id.as_str().into(),
            count_param(position as u64).into(),
            defect.defect_type.as_str().into(),
            defect.severity.clone().map_or(libsql::Value::Null, Into::into),
            defect.position_feet.map_or(libsql::Value::Null, Into::into),
            defect.description.clone().map_or(libsql::Value::Null, Into::into),
            extra,
        ];
        conn.execute(
            "INSERT INTO defects
                 (inspection_id, position, defect_type, severity, position_feet, description, extra_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            libsql::params_from_iter(params),
        )
        .await?;
    }
    Ok(())
}

/// `WHERE` clause and parameters for a filter. Parameters are numbered from 1.
fn filter_clause(filter: &SearchFilter) -> (String, Vec<libsql::Value>) {
    let mut clauses = Vec::new();
    let mut params: Vec<libsql::Value> = Vec::new();

    if let Some(city) = filter.city.as_deref() {
        params.push(like_contains(city).into());
        clauses.push(format!("city LIKE ?{} ESCAPE '\\'", params.len()));
    }
    if let Some(state) = filter.state.as_deref() {
        params.push(state.into());
        clauses.push(format!("state = ?{}", params.len()));
    }
    if let Some(material) = filter.material.as_deref() {
        params.push(like_contains(material).into());
        clauses.push(format!("material LIKE ?{} ESCAPE '\\'", params.len()));
    }
    if let Some(min) = filter.score_min {
        params.push(min.into());
        clauses.push(format!("score >= ?{}", params.len()));
    }
    if let Some(max) = filter.score_max {
        params.push(max.into());
        clauses.push(format!("score <= ?{}", params.len()));
    }
    if let Some(repair) = filter.requires_repair {
        params.push(i64::from(repair).into());
        clauses.push(format!("requires_repair = ?{}", params.len()));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

impl Store {
    /// Insert or replace `records` in one transaction.
    ///
    /// Each record is written under its own savepoint; a record that fails is
    /// rolled back alone and reported in [`BatchWriteOutcome::failed`] while
    /// the rest of the batch commits.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the transaction cannot begin or commit. In
    /// that case nothing from the batch is written.
    pub async fn upsert_batch(
        &self,
        records: &[InspectionRecord],
        source_id: &str,
    ) -> Result<BatchWriteOutcome, DatabaseError> {
        let mut outcome = BatchWriteOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        let imported_at = format_datetime(&Utc::now());
        let tx = self.conn().transaction().await?;
        for record in records {
            tx.execute("SAVEPOINT rec", ()).await?;
            match write_inspection(&tx, record, source_id, &imported_at).await {
                Ok(()) => {
                    tx.execute("RELEASE rec", ()).await?;
                    outcome.written += 1;
                }
                Err(e) => {
                    tracing::warn!(id = %record.id, source_id, error = %e, "record write failed");
                    tx.execute("ROLLBACK TO rec", ()).await?;
                    tx.execute("RELEASE rec", ()).await?;
                    outcome.failed.push(BatchWriteError {
                        id: record.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        tx.commit().await?;

        tracing::debug!(
            source_id,
            written = outcome.written,
            failed = outcome.failed.len(),
            "batch committed"
        );
        Ok(outcome)
    }

    /// The subset of `ids` already present in the store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a lookup query fails.
    pub async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, DatabaseError> {
        let mut found = HashSet::new();
        for chunk in ids.chunks(ID_LOOKUP_CHUNK) {
            let sql = format!(
                "SELECT id FROM inspections WHERE id IN ({})",
                placeholders(1, chunk.len())
            );
            let params: Vec<libsql::Value> =
                chunk.iter().map(|id| id.as_str().into()).collect();
            let mut rows = self
                .conn()
                .query(&sql, libsql::params_from_iter(params))
                .await?;
            while let Some(row) = rows.next().await? {
                found.insert(row.get::<String>(0)?);
            }
        }
        Ok(found)
    }

    /// Get one inspection with its defects.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no inspection has this ID.
    pub async fn get_inspection(&self, id: &str) -> Result<InspectionRecord, DatabaseError> {
        let mut rows = self
            .reader()
            .query(&format!("{SELECT_INSPECTION} WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let mut records = vec![row_to_inspection(&row)?];
        self.attach_defects(&mut records).await?;
        records.pop().ok_or(DatabaseError::NoResult)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_inspections(&self) -> Result<u64, DatabaseError> {
        self.count_rows("SELECT COUNT(*) FROM inspections").await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_defects(&self) -> Result<u64, DatabaseError> {
        self.count_rows("SELECT COUNT(*) FROM defects").await
    }

    /// One page of inspections matching `filter`, newest first, and the exact
    /// number of matches.
    ///
    /// The filter is used as given; callers normalize page bounds first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if either query fails.
    pub async fn search(
        &self,
        filter: &SearchFilter,
    ) -> Result<(Vec<InspectionRecord>, u64), DatabaseError> {
        let (where_clause, params) = filter_clause(filter);
        let offset = filter.offset();

        let mut page_params = params.clone();
        page_params.push(i64::from(filter.page_size).into());
        let limit_idx = page_params.len();
        page_params.push(count_param(offset).into());
        let offset_idx = page_params.len();
        let sql = format!(
            "{SELECT_INSPECTION}{where_clause}
             ORDER BY inspected_at DESC, rowid ASC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        let mut rows = self
            .reader()
            .query(&sql, libsql::params_from_iter(page_params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_inspection(&row)?);
        }
        self.attach_defects(&mut records).await?;

        let mut rows = self
            .reader()
            .query(
                &format!("SELECT COUNT(*) FROM inspections{where_clause}"),
                libsql::params_from_iter(params),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let counted = get_count(&row, 0)?;

        // A concurrent import can commit between the two reads.
        let total = counted.max(offset + records.len() as u64);
        Ok((records, total))
    }

    /// Load defects for `records` in one query per lookup chunk.
    async fn attach_defects(&self, records: &mut [InspectionRecord]) -> Result<(), DatabaseError> {
        if records.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut by_parent: HashMap<String, Vec<DefectRecord>> = HashMap::new();
        for chunk in ids.chunks(ID_LOOKUP_CHUNK) {
            let sql = format!(
                "SELECT inspection_id, defect_type, severity, position_feet, description, extra_json
                 FROM defects WHERE inspection_id IN ({}) ORDER BY inspection_id, position",
                placeholders(1, chunk.len())
            );
            let params: Vec<libsql::Value> =
                chunk.iter().map(|id| id.as_str().into()).collect();
            let mut rows = self
                .reader()
                .query(&sql, libsql::params_from_iter(params))
                .await?;
            while let Some(row) = rows.next().await? {
                let (parent, defect) = row_to_defect(&row)?;
                by_parent.entry(parent).or_default().push(defect);
            }
        }
        for record in records {
            record.defects = by_parent.remove(&record.id).unwrap_or_default();
        }
        Ok(())
    }

    pub(crate) async fn count_rows(&self, sql: &str) -> Result<u64, DatabaseError> {
        let mut rows = self.reader().query(sql, ()).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        get_count(&row, 0)
    }
}
