//! Store-wide aggregates and integrity checks.

use conduit_core::responses::{GroupCount, IntegrityReport, StoreSummary};

use crate::Store;
use crate::error::DatabaseError;
use crate::helpers::get_count;

impl Store {
    /// Totals, score statistics and per-group counts over the whole store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any aggregate query fails.
    pub async fn summary(&self) -> Result<StoreSummary, DatabaseError> {
        let mut rows = self
            .reader()
            .query(
                "SELECT COUNT(*), COALESCE(SUM(requires_repair), 0), AVG(score), MIN(score), MAX(score)
                 FROM inspections",
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;

        Ok(StoreSummary {
            total_inspections: get_count(&row, 0)?,
            requires_repair: get_count(&row, 1)?,
            average_score: row.get::<Option<f64>>(2)?,
            min_score: row.get::<Option<f64>>(3)?,
            max_score: row.get::<Option<f64>>(4)?,
            total_defects: self.count_defects().await?,
            by_state: self
                .group_counts("SELECT state, COUNT(*) FROM inspections GROUP BY state")
                .await?,
            by_material: self
                .group_counts("SELECT material, COUNT(*) FROM inspections GROUP BY material")
                .await?,
            defects_by_severity: self
                .group_counts(
                    "SELECT COALESCE(severity, 'unspecified'), COUNT(*) FROM defects
                     GROUP BY COALESCE(severity, 'unspecified')",
                )
                .await?,
        })
    }

    /// Defect rows whose parent inspection is missing.
    ///
    /// Foreign keys make this zero in normal operation; a non-zero count means
    /// rows were written with enforcement off.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_orphan_defects(&self) -> Result<u64, DatabaseError> {
        self.count_rows(
            "SELECT COUNT(*) FROM defects d
             LEFT JOIN inspections i ON i.id = d.inspection_id
             WHERE i.id IS NULL",
        )
        .await
    }

    /// Row counts plus the orphan check, for `cdt check`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any query fails.
    pub async fn integrity_report(&self) -> Result<IntegrityReport, DatabaseError> {
        let orphan_defects = self.find_orphan_defects().await?;
        Ok(IntegrityReport {
            inspections: self.count_inspections().await?,
            defects: self.count_defects().await?,
            orphan_defects,
            checkpoints: self.count_checkpoints().await?,
            ok: orphan_defects == 0,
        })
    }

    /// Run a two-column `key, count` query, largest groups first.
    async fn group_counts(&self, sql: &str) -> Result<Vec<GroupCount>, DatabaseError> {
        let sql = format!("{sql} ORDER BY 2 DESC, 1 ASC");
        let mut rows = self.reader().query(&sql, ()).await?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next().await? {
            groups.push(GroupCount {
                key: row.get::<String>(0)?,
                count: get_count(&row, 1)?,
            });
        }
        Ok(groups)
    }
}
