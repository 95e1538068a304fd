//! `LearningRecord` upsert, batch upsert, the due-list hot path, and per-user
//! stats queries (spec §4.2).

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::domain::{DueItem, ItemKind, LearningRecord};
use crate::store::{Store, StoreError};

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<LearningRecord, StoreError> {
    Ok(LearningRecord {
        user_id: row.try_get("user_id")?,
        item_id: row.try_get("item_id")?,
        kind: ItemKind::parse(&row.try_get::<String, _>("kind")?)?,
        learn_count: row.try_get("learn_count")?,
        correct_count: row.try_get("correct_count")?,
        consecutive_correct: row.try_get("consecutive_correct")?,
        easiness_factor: row.try_get("easiness_factor")?,
        memory_strength: row.try_get("memory_strength")?,
        mastery_level: row.try_get("mastery_level")?,
        last_review_at: row.try_get("last_review_at")?,
        next_review_at: row.try_get("next_review_at")?,
    })
}

impl Store {
    pub async fn get_learning_record(
        &self,
        user_id: &str,
        item_id: i64,
        kind: ItemKind,
    ) -> Result<Option<LearningRecord>, StoreError> {
        let started = std::time::Instant::now();
        let row = sqlx::query(
            "SELECT * FROM learning_records WHERE user_id = ? AND item_id = ? AND kind = ?",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(kind.as_str())
        .fetch_optional(self.pool())
        .await?;
        self.record_query(started.elapsed(), "get_learning_record");
        row.as_ref().map(row_to_record).transpose()
    }

    /// Idempotent single-row upsert (spec §4.2): the hot write path behind
    /// `record_attempt`. Re-running with identical inputs leaves the row
    /// unchanged.
    pub async fn upsert_learning_record(&self, record: &LearningRecord) -> Result<(), StoreError> {
        let started = std::time::Instant::now();
        sqlx::query(
            r#"
            INSERT INTO learning_records
                (user_id, item_id, kind, learn_count, correct_count, consecutive_correct,
                 easiness_factor, memory_strength, mastery_level, last_review_at, next_review_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, item_id, kind) DO UPDATE SET
                learn_count = excluded.learn_count,
                correct_count = excluded.correct_count,
                consecutive_correct = excluded.consecutive_correct,
                easiness_factor = excluded.easiness_factor,
                memory_strength = excluded.memory_strength,
                mastery_level = excluded.mastery_level,
                last_review_at = excluded.last_review_at,
                next_review_at = excluded.next_review_at
            "#,
        )
        .bind(&record.user_id)
        .bind(record.item_id)
        .bind(record.kind.as_str())
        .bind(record.learn_count)
        .bind(record.correct_count)
        .bind(record.consecutive_correct)
        .bind(record.easiness_factor)
        .bind(record.memory_strength)
        .bind(record.mastery_level)
        .bind(record.last_review_at)
        .bind(record.next_review_at)
        .execute(self.pool())
        .await?;
        self.record_query(started.elapsed(), "upsert_learning_record");
        Ok(())
    }

    /// Single-transaction batch upsert (spec §4.2, §9 open question 1 — the
    /// canonical union of the two overlapping source methods). Full rollback
    /// on any error.
    pub async fn batch_upsert_learning_records(
        &self,
        records: &[LearningRecord],
    ) -> Result<(), StoreError> {
        let started = std::time::Instant::now();
        let mut tx = self.pool().begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO learning_records
                    (user_id, item_id, kind, learn_count, correct_count, consecutive_correct,
                     easiness_factor, memory_strength, mastery_level, last_review_at, next_review_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (user_id, item_id, kind) DO UPDATE SET
                    learn_count = excluded.learn_count,
                    correct_count = excluded.correct_count,
                    consecutive_correct = excluded.consecutive_correct,
                    easiness_factor = excluded.easiness_factor,
                    memory_strength = excluded.memory_strength,
                    mastery_level = excluded.mastery_level,
                    last_review_at = excluded.last_review_at,
                    next_review_at = excluded.next_review_at
                "#,
            )
            .bind(&record.user_id)
            .bind(record.item_id)
            .bind(record.kind.as_str())
            .bind(record.learn_count)
            .bind(record.correct_count)
            .bind(record.consecutive_correct)
            .bind(record.easiness_factor)
            .bind(record.memory_strength)
            .bind(record.mastery_level)
            .bind(record.last_review_at)
            .bind(record.next_review_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        self.record_query(started.elapsed(), "batch_upsert_learning_records");
        Ok(())
    }

    /// The due-list hot path (spec §4.1, §4.2): records due at or before `now`,
    /// ordered `(next_review_at asc, memory_strength asc, item_id asc)`, joined
    /// against the owning item table for a render-ready projection.
    pub async fn due_records(
        &self,
        user_id: &str,
        kind: Option<ItemKind>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DueItem>, StoreError> {
        let started = std::time::Instant::now();
        let kinds = match kind {
            Some(k) => vec![k],
            None => vec![ItemKind::Vocabulary, ItemKind::Grammar, ItemKind::Reading],
        };

        let mut items = Vec::new();
        for k in kinds {
            let (table, select_cols) = match k {
                ItemKind::Vocabulary => (
                    "vocabulary_items",
                    "it.headword AS headword, it.reading AS reading, it.meaning AS meaning",
                ),
                ItemKind::Grammar => (
                    "grammar_items",
                    "it.pattern AS headword, NULL AS reading, it.explanation AS meaning",
                ),
                ItemKind::Reading => (
                    "reading_items",
                    "it.title AS headword, NULL AS reading, it.body AS meaning",
                ),
            };
            let query = format!(
                r#"
                SELECT lr.*, {select_cols}
                FROM learning_records lr
                JOIN {table} it ON it.item_id = lr.item_id
                WHERE lr.user_id = ? AND lr.kind = ? AND lr.next_review_at <= ?
                ORDER BY lr.next_review_at ASC, lr.memory_strength ASC, lr.item_id ASC
                LIMIT ?
                "#
            );
            let rows = sqlx::query(&query)
                .bind(user_id)
                .bind(k.as_str())
                .bind(now)
                .bind(limit)
                .fetch_all(self.pool())
                .await?;
            for row in &rows {
                items.push(DueItem {
                    record: row_to_record(row)?,
                    headword: row.try_get("headword")?,
                    reading: row.try_get("reading")?,
                    meaning: row.try_get("meaning")?,
                });
            }
        }

        let mut ordered = crate::scheduler::Scheduler::order_due(items);
        ordered.truncate(limit.max(0) as usize);
        self.record_query(started.elapsed(), "due_records");
        Ok(ordered)
    }

    pub async fn due_count(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let started = std::time::Instant::now();
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM learning_records WHERE user_id = ? AND next_review_at <= ?",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(self.pool())
        .await?;
        self.record_query(started.elapsed(), "due_count");
        Ok(row.try_get("n")?)
    }

    pub async fn mastery_distribution(&self, user_id: &str) -> Result<Vec<(i64, i64)>, StoreError> {
        let started = std::time::Instant::now();
        let rows = sqlx::query(
            "SELECT mastery_level, COUNT(*) AS n FROM learning_records WHERE user_id = ? GROUP BY mastery_level ORDER BY mastery_level",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        self.record_query(started.elapsed(), "mastery_distribution");
        rows.iter()
            .map(|r| Ok((r.try_get::<i64, _>("mastery_level")?, r.try_get::<i64, _>("n")?)))
            .collect()
    }

    pub async fn recent_activity_count(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let started = std::time::Instant::now();
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM learning_records WHERE user_id = ? AND last_review_at >= ?",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(self.pool())
        .await?;
        self.record_query(started.elapsed(), "recent_activity_count");
        Ok(row.try_get("n")?)
    }

    pub async fn total_learn_and_correct(&self, user_id: &str) -> Result<(i64, i64), StoreError> {
        let started = std::time::Instant::now();
        let row = sqlx::query(
            "SELECT COALESCE(SUM(learn_count), 0) AS learn, COALESCE(SUM(correct_count), 0) AS correct
             FROM learning_records WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        self.record_query(started.elapsed(), "total_learn_and_correct");
        Ok((row.try_get("learn")?, row.try_get("correct")?))
    }

    /// Records touched strictly inside `[window_start, window_end]` — the
    /// session window (spec.md §4.3/§4.5), not everything touched since some
    /// lower bound. Without the upper bound, activity from a later session
    /// (or ongoing attempts after this one) would leak into an earlier
    /// session's roll-up.
    pub async fn records_touched_between(
        &self,
        user_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<LearningRecord>, StoreError> {
        let started = std::time::Instant::now();
        let rows = sqlx::query(
            "SELECT * FROM learning_records WHERE user_id = ? AND last_review_at >= ? AND last_review_at <= ? ORDER BY last_review_at",
        )
        .bind(user_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(self.pool())
        .await?;
        self.record_query(started.elapsed(), "records_touched_between");
        rows.iter().map(row_to_record).collect()
    }
}
