//! Persistent typed storage (C1, spec §4.2): a pooled, indexed, transactional
//! sqlite store shared by every other component. Backed by `sqlx` rather than
//! the teacher's embedded `sled` tree store — the spec's pool/pragma/index
//! contract is SQL-shaped, and `sqlx::SqlitePool` is the idiomatic way the rest
//! of this pack (`iqrahapp-iqrah-mobile`) expresses exactly that contract.

pub mod operations;
pub mod stats;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::StoreConfig;
pub use stats::{QueryStats, SlowQuery};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("connection pool exhausted: {0}")]
    PoolExhausted(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration {
            version: 0,
            message: value.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    stats: std::sync::Arc<QueryStats>,
}

impl Store {
    /// Opens (creating if absent) the sqlite database at `path`, with every
    /// connection pre-configured per spec §4.2: WAL, `synchronous=NORMAL`,
    /// foreign keys on, shared cache, bounded `acquire_timeout`.
    pub async fn open(path: &str, config: &StoreConfig) -> Result<Self, StoreError> {
        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .shared_cache(true)
            .busy_timeout(Duration::from_secs(config.pool_acquire_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_max_connections)
            .acquire_timeout(Duration::from_secs(config.pool_acquire_timeout_secs))
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::PoolExhausted(e.to_string()))?;

        Ok(Self {
            pool,
            stats: std::sync::Arc::new(QueryStats::new(
                config.slow_query_threshold_ms,
                config.slow_query_window,
            )),
        })
    }

    /// An in-memory store used by tests and the property-test harness.
    pub async fn open_in_memory(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open(":memory:", config).await
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn stats(&self) -> stats::QueryStatsSnapshot {
        self.stats.snapshot()
    }

    /// Operator maintenance entry point (CLI `vacuum`, spec §6): reclaim free
    /// pages and refresh the query planner's statistics. Never called from the
    /// HTTP surface.
    pub async fn vacuum(&self) -> Result<(), StoreError> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        sqlx::query("ANALYZE").execute(&self.pool).await?;
        Ok(())
    }

    /// Removes every `LearningRecord` for a user inside one transaction — the
    /// one delete path spec §3 names ("never deleted except via
    /// user-data-delete").
    pub async fn delete_user_data(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM learning_records WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub(crate) fn record_query(&self, elapsed: Duration, label: &'static str) {
        self.stats.record(elapsed, label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemKind, LearningRecord};

    fn sample_record(user_id: &str, item_id: i64) -> LearningRecord {
        let now = chrono::Utc::now();
        LearningRecord {
            user_id: user_id.to_string(),
            item_id,
            kind: ItemKind::Vocabulary,
            learn_count: 1,
            correct_count: 1,
            consecutive_correct: 1,
            easiness_factor: 2.5,
            memory_strength: 1.0,
            mastery_level: 0,
            last_review_at: now,
            next_review_at: now + chrono::Duration::days(1),
        }
    }

    #[tokio::test]
    async fn open_against_a_real_file_path_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("tutor.db");
        let db_path_str = db_path.to_str().unwrap().to_string();
        let config = StoreConfig::default();

        let store = Store::open(&db_path_str, &config).await.unwrap();
        store.run_migrations().await.unwrap();
        store.upsert_learning_record(&sample_record("U", 1)).await.unwrap();
        drop(store);

        let reopened = Store::open(&db_path_str, &config).await.unwrap();
        let fetched = reopened
            .get_learning_record("U", 1, ItemKind::Vocabulary)
            .await
            .unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn vacuum_runs_without_error() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        store.vacuum().await.unwrap();
    }

    #[tokio::test]
    async fn delete_user_data_removes_only_that_users_records() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        store.upsert_learning_record(&sample_record("alice", 1)).await.unwrap();
        store.upsert_learning_record(&sample_record("bob", 2)).await.unwrap();

        let deleted = store.delete_user_data("alice").await.unwrap();
        assert_eq!(deleted, 1);

        assert!(store
            .get_learning_record("alice", 1, ItemKind::Vocabulary)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_learning_record("bob", 2, ItemKind::Vocabulary)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn stats_snapshot_starts_empty_and_counts_after_a_query() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        assert_eq!(store.stats().query_count, 0);

        store
            .get_learning_record("U", 1, ItemKind::Vocabulary)
            .await
            .unwrap();
        assert_eq!(store.stats().query_count, 1);
    }
}
