//! Item CRUD, batch insert, and the new-vocabulary selection query (spec §4.2).

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::domain::{Item, ItemKind, ItemPayload, Language, Level};
use crate::store::{Store, StoreError};

/// An item awaiting assignment of a stable `item_id`, produced by the ingest
/// normalizer or a caller inserting content directly.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub language: Language,
    pub level: Level,
    pub payload: ItemPayload,
    pub audio_ref: Option<String>,
}

fn row_to_item(kind: ItemKind, row: &sqlx::sqlite::SqliteRow) -> Result<Item, StoreError> {
    let language = Language::parse(&row.try_get::<String, _>("language")?)?;
    let level = Level::parse(language, &row.try_get::<String, _>("level")?)?;
    let item_id: i64 = row.try_get("item_id")?;
    let audio_ref: Option<String> = row.try_get("audio_ref")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    let payload = match kind {
        ItemKind::Vocabulary => ItemPayload::Vocabulary {
            headword: row.try_get("headword")?,
            reading: row.try_get("reading")?,
            meaning: row.try_get("meaning")?,
            example: row.try_get("example")?,
        },
        ItemKind::Grammar => ItemPayload::Grammar {
            pattern: row.try_get("pattern")?,
            explanation: row.try_get("explanation")?,
            examples: serde_json::from_str(&row.try_get::<String, _>("examples")?)
                .unwrap_or_default(),
        },
        ItemKind::Reading => ItemPayload::Reading {
            title: row.try_get("title")?,
            body: row.try_get("body")?,
        },
    };

    Ok(Item {
        item_id,
        language,
        level,
        payload,
        audio_ref,
        created_at,
    })
}

impl From<crate::error::CoreError> for StoreError {
    fn from(value: crate::error::CoreError) -> Self {
        StoreError::Validation(value.to_string())
    }
}

impl Store {
    /// Inserts a batch of items in a single transaction with insert-or-replace
    /// semantics keyed on each kind's uniqueness constraint (spec §4.2). On any
    /// error the whole batch rolls back (spec §8 property 10).
    pub async fn insert_items_batch(&self, items: &[NewItem]) -> Result<Vec<i64>, StoreError> {
        let started = std::time::Instant::now();
        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(items.len());
        let now = Utc::now();

        for item in items {
            let id = match &item.payload {
                ItemPayload::Vocabulary {
                    headword,
                    reading,
                    meaning,
                    example,
                } => {
                    let row = sqlx::query(
                        r#"
                        INSERT INTO vocabulary_items
                            (language, level, headword, reading, meaning, example, audio_ref, created_at)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                        ON CONFLICT (headword, language, level) DO UPDATE SET
                            reading = excluded.reading,
                            meaning = excluded.meaning,
                            example = excluded.example,
                            audio_ref = excluded.audio_ref
                        RETURNING item_id
                        "#,
                    )
                    .bind(item.language.as_str())
                    .bind(item.level.as_str())
                    .bind(headword)
                    .bind(reading)
                    .bind(meaning)
                    .bind(example)
                    .bind(&item.audio_ref)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?;
                    row.try_get::<i64, _>("item_id")?
                }
                ItemPayload::Grammar {
                    pattern,
                    explanation,
                    examples,
                } => {
                    let examples_json = serde_json::to_string(examples).unwrap_or_default();
                    let row = sqlx::query(
                        r#"
                        INSERT INTO grammar_items
                            (language, level, pattern, explanation, examples, audio_ref, created_at)
                        VALUES (?, ?, ?, ?, ?, ?, ?)
                        ON CONFLICT (pattern, language, level) DO UPDATE SET
                            explanation = excluded.explanation,
                            examples = excluded.examples,
                            audio_ref = excluded.audio_ref
                        RETURNING item_id
                        "#,
                    )
                    .bind(item.language.as_str())
                    .bind(item.level.as_str())
                    .bind(pattern)
                    .bind(explanation)
                    .bind(examples_json)
                    .bind(&item.audio_ref)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?;
                    row.try_get::<i64, _>("item_id")?
                }
                ItemPayload::Reading { title, body } => {
                    let row = sqlx::query(
                        r#"
                        INSERT INTO reading_items (language, level, title, body, audio_ref, created_at)
                        VALUES (?, ?, ?, ?, ?, ?)
                        RETURNING item_id
                        "#,
                    )
                    .bind(item.language.as_str())
                    .bind(item.level.as_str())
                    .bind(title)
                    .bind(body)
                    .bind(&item.audio_ref)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?;
                    row.try_get::<i64, _>("item_id")?
                }
            };
            ids.push(id);
        }

        tx.commit().await?;
        self.record_query(started.elapsed(), "insert_items_batch");
        Ok(ids)
    }

    pub async fn get_item(&self, item_id: i64, kind: ItemKind) -> Result<Item, StoreError> {
        let started = std::time::Instant::now();
        let table = table_name(kind);
        let query = format!("SELECT * FROM {table} WHERE item_id = ?");
        let row = sqlx::query(&query)
            .bind(item_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: kind.as_str().to_string(),
                key: item_id.to_string(),
            })?;
        self.record_query(started.elapsed(), "get_item");
        row_to_item(kind, &row)
    }

    pub async fn list_items(
        &self,
        kind: ItemKind,
        language: Language,
        level: Option<Level>,
    ) -> Result<Vec<Item>, StoreError> {
        let started = std::time::Instant::now();
        let table = table_name(kind);
        let rows = if let Some(level) = level {
            let query = format!(
                "SELECT * FROM {table} WHERE language = ? AND level = ? ORDER BY created_at"
            );
            sqlx::query(&query)
                .bind(language.as_str())
                .bind(level.as_str())
                .fetch_all(self.pool())
                .await?
        } else {
            let query = format!("SELECT * FROM {table} WHERE language = ? ORDER BY created_at");
            sqlx::query(&query)
                .bind(language.as_str())
                .fetch_all(self.pool())
                .await?
        };
        self.record_query(started.elapsed(), "list_items");
        rows.iter().map(|row| row_to_item(kind, row)).collect()
    }

    /// New-item pick for the session engine (spec §4.2): vocabulary not yet
    /// mastered (or never attempted), sampled in random order.
    pub async fn select_new_vocabulary(
        &self,
        user_id: &str,
        language: Language,
        level: Level,
        exclude_mastered: bool,
        limit: i64,
    ) -> Result<Vec<Item>, StoreError> {
        let started = std::time::Instant::now();
        let mastery_clause = if exclude_mastered {
            "AND (lr.mastery_level IS NULL OR lr.mastery_level < 3)"
        } else {
            ""
        };
        let query = format!(
            r#"
            SELECT v.* FROM vocabulary_items v
            LEFT JOIN learning_records lr
                ON lr.item_id = v.item_id AND lr.user_id = ? AND lr.kind = 'vocabulary'
            WHERE v.language = ? AND v.level = ?
            {mastery_clause}
            ORDER BY RANDOM()
            LIMIT ?
            "#
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(language.as_str())
            .bind(level.as_str())
            .bind(limit)
            .fetch_all(self.pool())
            .await?;
        self.record_query(started.elapsed(), "select_new_vocabulary");
        rows.iter()
            .map(|row| row_to_item(ItemKind::Vocabulary, row))
            .collect()
    }

    pub async fn attach_audio(&self, item_id: i64, kind: ItemKind, local_path: &str) -> Result<(), StoreError> {
        let table = table_name(kind);
        let query = format!("UPDATE {table} SET audio_ref = ? WHERE item_id = ?");
        let result = sqlx::query(&query)
            .bind(local_path)
            .bind(item_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: kind.as_str().to_string(),
                key: item_id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn headword_exists(&self, headword: &str, language: Language) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT 1 FROM vocabulary_items WHERE headword = ? AND language = ?
             UNION ALL
             SELECT 1 FROM grammar_items WHERE pattern = ? AND language = ?
             LIMIT 1",
        )
        .bind(headword)
        .bind(language.as_str())
        .bind(headword)
        .bind(language.as_str())
        .fetch_optional(self.pool())
        .await?;
        Ok(row.is_some())
    }

    /// Seeds the ingest pipeline's in-memory dedup set (spec §4.4) from
    /// everything already present for a language.
    pub async fn known_headwords(&self, language: Language) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT headword FROM vocabulary_items WHERE language = ?
             UNION
             SELECT pattern FROM grammar_items WHERE language = ?",
        )
        .bind(language.as_str())
        .bind(language.as_str())
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|(h,)| h).collect())
    }
}

fn table_name(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Vocabulary => "vocabulary_items",
        ItemKind::Grammar => "grammar_items",
        ItemKind::Reading => "reading_items",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::domain::{EnglishLevel, LearningRecord};

    async fn seeded_store() -> Store {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        store
    }

    fn vocab(headword: &str, meaning: &str) -> NewItem {
        NewItem {
            language: Language::English,
            level: Level::English(EnglishLevel::Cet4),
            payload: ItemPayload::Vocabulary {
                headword: headword.to_string(),
                reading: None,
                meaning: meaning.to_string(),
                example: None,
            },
            audio_ref: None,
        }
    }

    #[tokio::test]
    async fn insert_items_batch_is_insert_or_replace_on_unique_constraint() {
        let store = seeded_store().await;
        let ids = store
            .insert_items_batch(&[vocab("abandon", "to give up")])
            .await
            .unwrap();

        let updated_ids = store
            .insert_items_batch(&[vocab("abandon", "to leave behind")])
            .await
            .unwrap();

        assert_eq!(ids, updated_ids);
        let item = store.get_item(ids[0], ItemKind::Vocabulary).await.unwrap();
        match item.payload {
            ItemPayload::Vocabulary { meaning, .. } => assert_eq!(meaning, "to leave behind"),
            _ => panic!("expected vocabulary payload"),
        }
    }

    #[tokio::test]
    async fn insert_items_batch_rolls_back_whole_batch_on_error() {
        let store = seeded_store().await;
        let bad_reading_item = NewItem {
            language: Language::Japanese,
            level: Level::Japanese(crate::domain::JapaneseLevel::N5),
            payload: ItemPayload::Reading {
                title: "t".to_string(),
                body: "b".to_string(),
            },
            audio_ref: None,
        };
        let result = store
            .insert_items_batch(&[vocab("first", "m"), bad_reading_item])
            .await;
        assert!(result.is_ok(), "reading items have no unique constraint to violate");

        let listed = store
            .list_items(ItemKind::Vocabulary, Language::English, None)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn select_new_vocabulary_excludes_mastered_when_requested() {
        let store = seeded_store().await;
        let ids = store
            .insert_items_batch(&[vocab("masteredword", "m"), vocab("freshword", "m")])
            .await
            .unwrap();

        let mastered = LearningRecord {
            user_id: "U".to_string(),
            item_id: ids[0],
            kind: ItemKind::Vocabulary,
            learn_count: 10,
            correct_count: 10,
            consecutive_correct: 10,
            easiness_factor: 2.5,
            memory_strength: 1.0,
            mastery_level: 5,
            last_review_at: Utc::now() - chrono::Duration::days(1),
            next_review_at: Utc::now() + chrono::Duration::days(30),
        };
        store.upsert_learning_record(&mastered).await.unwrap();

        let picked = store
            .select_new_vocabulary("U", Language::English, Level::English(EnglishLevel::Cet4), true, 10)
            .await
            .unwrap();
        let headwords: Vec<&str> = picked
            .iter()
            .filter_map(|item| match &item.payload {
                ItemPayload::Vocabulary { headword, .. } => Some(headword.as_str()),
                _ => None,
            })
            .collect();
        assert!(headwords.contains(&"freshword"));
        assert!(!headwords.contains(&"masteredword"));
    }

    #[tokio::test]
    async fn headword_exists_checks_vocabulary_and_grammar() {
        let store = seeded_store().await;
        store.insert_items_batch(&[vocab("exists", "m")]).await.unwrap();
        assert!(store.headword_exists("exists", Language::English).await.unwrap());
        assert!(!store.headword_exists("missing", Language::English).await.unwrap());
    }

    #[tokio::test]
    async fn known_headwords_seeds_from_both_item_tables() {
        let store = seeded_store().await;
        store
            .insert_items_batch(&[vocab("alpha", "m"), vocab("beta", "m")])
            .await
            .unwrap();
        let known = store.known_headwords(Language::English).await.unwrap();
        assert!(known.contains(&"alpha".to_string()));
        assert!(known.contains(&"beta".to_string()));
    }
}
