//! User profile reads/writes. Credential verification itself is an external
//! concern (spec §3); the core only persists the profile.

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::domain::{EnglishLevel, JapaneseLevel, LevelPreferences, User};
use crate::store::{Store, StoreError};

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, StoreError> {
    let english_level: Option<String> = row.try_get("english_level")?;
    let japanese_level: Option<String> = row.try_get("japanese_level")?;
    Ok(User {
        user_id: row.try_get("user_id")?,
        credential_hash: row.try_get("credential_hash")?,
        preferences: LevelPreferences {
            english_level: english_level.and_then(|l| parse_english(&l)),
            japanese_level: japanese_level.and_then(|l| parse_japanese(&l)),
        },
        daily_study_minutes: row.try_get::<i64, _>("daily_study_minutes")? as u32,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_english(raw: &str) -> Option<EnglishLevel> {
    match raw {
        "cet-4" => Some(EnglishLevel::Cet4),
        "cet-5" => Some(EnglishLevel::Cet5),
        "cet-6" => Some(EnglishLevel::Cet6),
        _ => None,
    }
}

fn parse_japanese(raw: &str) -> Option<JapaneseLevel> {
    match raw {
        "n5" => Some(JapaneseLevel::N5),
        "n4" => Some(JapaneseLevel::N4),
        "n3" => Some(JapaneseLevel::N3),
        "n2" => Some(JapaneseLevel::N2),
        "n1" => Some(JapaneseLevel::N1),
        _ => None,
    }
}

impl Store {
    pub async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let started = std::time::Instant::now();
        sqlx::query(
            r#"
            INSERT INTO users (user_id, credential_hash, english_level, japanese_level, daily_study_minutes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                credential_hash = excluded.credential_hash,
                english_level = excluded.english_level,
                japanese_level = excluded.japanese_level,
                daily_study_minutes = excluded.daily_study_minutes
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.credential_hash)
        .bind(user.preferences.english_level.map(|l| l.as_str()))
        .bind(user.preferences.japanese_level.map(|l| l.as_str()))
        .bind(i64::from(user.daily_study_minutes))
        .bind(user.created_at)
        .execute(self.pool())
        .await?;
        self.record_query(started.elapsed(), "upsert_user");
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        let started = std::time::Instant::now();
        let row = sqlx::query("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user".to_string(),
                key: user_id.to_string(),
            })?;
        self.record_query(started.elapsed(), "get_user");
        row_to_user(&row)
    }

    pub async fn last_ingest_run(&self) -> Result<Option<(DateTime<Utc>, String)>, StoreError> {
        let row = sqlx::query("SELECT ran_at, stats_json FROM ingest_runs ORDER BY id DESC LIMIT 1")
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(r) => Ok(Some((r.try_get("ran_at")?, r.try_get("stats_json")?))),
            None => Ok(None),
        }
    }

    pub async fn record_ingest_run(&self, ran_at: DateTime<Utc>, stats_json: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO ingest_runs (ran_at, stats_json) VALUES (?, ?)")
            .bind(ran_at)
            .bind(stats_json)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
