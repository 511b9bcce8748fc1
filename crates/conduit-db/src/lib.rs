//! # conduit-db
//!
//! libSQL structured store for imported inspections and the import
//! checkpoint ledger.
//!
//! The store is tuned for one writer and many readers: WAL journaling so
//! searches are never blocked by an in-progress import, `synchronous=NORMAL`
//! for write throughput, and a bounded page cache. Under `NORMAL` a process
//! crash can lose the last few committed transactions; the store is a
//! rebuildable cache of the remote sources, and the importer re-does at most
//! one batch on resume.
//!
//! File-backed stores keep a dedicated reader connection next to the writer.
//! `:memory:` databases are private to a connection, so both roles share one.

pub mod error;
pub mod helpers;
mod lazy;
mod migrations;
pub mod repos;

use conduit_config::StoreConfig;
use error::DatabaseError;
use libsql::Builder;

pub use error::BatchWriteError;
pub use lazy::LazyStore;
pub use repos::inspections::BatchWriteOutcome;

/// Connection tuning applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub cache_size_kib: u32,
    pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_size_kib: 8 * 1024,
            busy_timeout_ms: 5000,
        }
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            cache_size_kib: config.cache_size_kib,
            busy_timeout_ms: config.busy_timeout_ms,
        }
    }
}

/// Handle to the structured store.
pub struct Store {
    #[allow(dead_code)]
    db: libsql::Database,
    writer: libsql::Connection,
    reader: libsql::Connection,
    path: String,
}

impl Store {
    /// Open (or create) a local database at `path` and run migrations.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened, a pragma
    /// cannot be applied, or migrations fail.
    pub async fn open_local(path: &str, options: StoreOptions) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let writer = db.connect()?;
        apply_pragmas(&writer, options).await?;

        let reader = if is_memory_path(path) {
            writer.clone()
        } else {
            let reader = db.connect()?;
            apply_pragmas(&reader, options).await?;
            reader
        };

        let store = Self {
            db,
            writer,
            reader,
            path: path.to_string(),
        };
        store.run_migrations().await?;
        tracing::debug!(path, ?options, "store opened");
        Ok(store)
    }

    /// Open an in-memory store (tests, throwaway runs).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open_local(":memory:", StoreOptions::default()).await
    }

    /// The writer connection. Imports and ledger writes go through here.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.writer
    }

    /// The reader connection used by searches and aggregates.
    #[must_use]
    pub const fn reader(&self) -> &libsql::Connection {
        &self.reader
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"imp-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .writer
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

fn is_memory_path(path: &str) -> bool {
    path == ":memory:" || path.starts_with("file::memory:")
}

/// Per-connection pragmas. Some pragmas report their new value as a row, so
/// each is run as a query and drained.
async fn apply_pragmas(conn: &libsql::Connection, options: StoreOptions) -> Result<(), DatabaseError> {
    let pragmas = [
        "PRAGMA journal_mode = WAL".to_string(),
        "PRAGMA synchronous = NORMAL".to_string(),
        "PRAGMA foreign_keys = ON".to_string(),
        format!("PRAGMA cache_size = -{}", options.cache_size_kib),
        format!("PRAGMA busy_timeout = {}", options.busy_timeout_ms),
    ];
    for pragma in &pragmas {
        let mut rows = conn
            .query(pragma, ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("{pragma}: {e}")))?;
        while rows
            .next()
            .await
            .map_err(|e| DatabaseError::Migration(format!("{pragma}: {e}")))?
            .is_some()
        {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn test_store() -> Store {
        Store::open_in_memory().await.unwrap()
    }

    async fn pragma_value(conn: &libsql::Connection, name: &str) -> String {
        let mut rows = conn.query(&format!("PRAGMA {name}"), ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        match row.get_value(0).unwrap() {
            libsql::Value::Integer(i) => i.to_string(),
            libsql::Value::Text(s) => s,
            other => format!("{other:?}"),
        }
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let store = test_store().await;
        for table in ["inspections", "defects", "import_checkpoints"] {
            let mut rows = store
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn filter_indexes_exist() {
        let store = test_store().await;
        for index in [
            "idx_inspections_city",
            "idx_inspections_state",
            "idx_inspections_material",
            "idx_inspections_score",
            "idx_inspections_repair",
            "idx_inspections_city_repair_score",
            "idx_inspections_material_score",
            "idx_inspections_inspected_at",
            "idx_defects_inspection",
            "idx_checkpoints_source_started",
        ] {
            let mut rows = store
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='index' AND name=?1",
                    [index],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "index '{index}' should exist");
        }
    }

    #[tokio::test]
    async fn file_store_uses_wal_and_tuned_pragmas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conduit.db");
        let options = StoreOptions {
            cache_size_kib: 2048,
            busy_timeout_ms: 1234,
        };
        let store = Store::open_local(path.to_str().unwrap(), options).await.unwrap();

        for conn in [store.conn(), store.reader()] {
            assert_eq!(pragma_value(conn, "journal_mode").await, "wal");
            assert_eq!(pragma_value(conn, "synchronous").await, "1");
            assert_eq!(pragma_value(conn, "foreign_keys").await, "1");
            assert_eq!(pragma_value(conn, "cache_size").await, "-2048");
            assert_eq!(pragma_value(conn, "busy_timeout").await, "1234");
        }
    }

    #[tokio::test]
    async fn reopening_a_file_store_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conduit.db");
        let path = path.to_str().unwrap();
        {
            let store = Store::open_local(path, StoreOptions::default()).await.unwrap();
            store
                .create_checkpoint("s1", conduit_core::entities::CheckpointCounters::default())
                .await
                .unwrap();
        }
        let store = Store::open_local(path, StoreOptions::default()).await.unwrap();
        assert!(store.latest_checkpoint("s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn generate_id_correct_format() {
        let store = test_store().await;
        let id = store.generate_id("imp").await.unwrap();
        assert!(id.starts_with("imp-"), "ID should start with 'imp-': {id}");
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn generate_id_uniqueness() {
        let store = test_store().await;
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = store.generate_id("imp").await.unwrap();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {id}");
        }
    }

    #[tokio::test]
    async fn idempotent_migrations() {
        let store = test_store().await;
        store.run_migrations().await.unwrap();
    }
}
