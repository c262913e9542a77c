//! SQLite backend for the knowledge graph.
//!
//! Uses a single database file with one table, `knowledge_triplets`.
//! Queries written by the model are rendered to text cell by cell, whatever
//! columns they select.

use crate::{QueryRows, TRIPLETS_TABLE, Triplet, guard};
use deepcontext_core::error::StoreError;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// The knowledge-triplet store.
///
/// Cheap to share behind an `Arc`; the pool handles concurrent access.
pub struct KnowledgeStore {
    pool: SqlitePool,
}

impl KnowledgeStore {
    /// Open (or create) the database at `path` and bootstrap the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(path = %path.display(), "Knowledge store initialized");
        Ok(store)
    }

    /// An ephemeral in-process database.
    ///
    /// Pinned to one connection that never expires: every connection to
    /// `:memory:` is a separate database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        Self::from_pool(pool).await
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {TRIPLETS_TABLE} (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                source_entity TEXT NOT NULL,
                relation      TEXT NOT NULL,
                target_entity TEXT NOT NULL,
                source_file   TEXT NOT NULL,
                created_at    TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("{TRIPLETS_TABLE} table: {e}")))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_triplets_source_entity ON {TRIPLETS_TABLE}(source_entity)"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("source_entity index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Insert a triplet and return its row id.
    pub async fn add_triplet(&self, triplet: &Triplet) -> Result<i64, StoreError> {
        let blank = triplet.blank_fields();
        if !blank.is_empty() {
            return Err(StoreError::InvalidTriplet(format!(
                "blank field(s): {}",
                blank.join(", ")
            )));
        }

        let result = sqlx::query(&format!(
            "INSERT INTO {TRIPLETS_TABLE} (source_entity, relation, target_entity, source_file)
             VALUES (?1, ?2, ?3, ?4)"
        ))
        .bind(triplet.source_entity.trim())
        .bind(triplet.relation.trim())
        .bind(triplet.target_entity.trim())
        .bind(triplet.source_file.trim())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(
            id,
            source = %triplet.source_entity,
            relation = %triplet.relation,
            target = %triplet.target_entity,
            "Triplet stored"
        );
        Ok(id)
    }

    /// Run a read-only query and render every cell as text.
    ///
    /// Rejected statements never reach the database. Accepted ones run in a
    /// transaction that is rolled back afterwards.
    pub async fn query(&self, sql: &str) -> Result<QueryRows, StoreError> {
        let statement = guard::ensure_read_only(sql)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        let fetched = sqlx::query(statement).fetch_all(&mut *tx).await;

        tx.rollback()
            .await
            .map_err(|e| StoreError::Storage(format!("ROLLBACK failed: {e}")))?;

        let rows = fetched.map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rendered = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| render_cell(row, i)).collect())
            .collect::<Result<Vec<Vec<String>>, StoreError>>()?;

        debug!(rows = rendered.len(), "Graph query executed");
        Ok(QueryRows {
            columns,
            rows: rendered,
        })
    }

    /// Number of stored triplets.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {TRIPLETS_TABLE}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        row.try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))
    }
}

/// Render one cell by its runtime storage class.
fn render_cell(row: &SqliteRow, idx: usize) -> Result<String, StoreError> {
    let raw = row
        .try_get_raw(idx)
        .map_err(|e| StoreError::QueryFailed(format!("column {idx}: {e}")))?;

    if raw.is_null() {
        return Ok("NULL".into());
    }

    let storage = raw.type_info().name().to_string();
    let cell = match storage.as_str() {
        "INTEGER" => row.try_get::<i64, _>(idx).map(|v| v.to_string()),
        "REAL" => row.try_get::<f64, _>(idx).map(|v| format!("{v:?}")),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|v| format!("<blob: {} bytes>", v.len())),
        _ => row.try_get::<String, _>(idx),
    };

    cell.map_err(|e| StoreError::QueryFailed(format!("column {idx}: {e}")))
}
