//! Session Engine (C3, spec §4.3): composes a timed daily study plan and
//! rolls up progress from `LearningRecord`s touched during it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::domain::{EnglishLevel, Item, ItemKind, JapaneseLevel, Language, Level, User};
use crate::error::CoreError;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityMode {
    Learn,
    Review,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Planned,
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub item_id: i64,
    pub kind: ItemKind,
    pub mode: ActivityMode,
    pub status: ActivityStatus,
    pub headword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlan {
    pub session_id: String,
    pub user_id: String,
    pub planned_minutes: u32,
    pub activities: Vec<Activity>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub english_level: Option<EnglishLevel>,
    pub japanese_level: Option<JapaneseLevel>,
    pub daily_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub items_attempted: i64,
    pub items_correct: i64,
    pub new_items_learned: i64,
    pub items_mastered: i64,
    pub review_hit_rate: f64,
}

/// Rough per-item time budget used to size the plan; the engine itself
/// composes a list of activities, not a wall-clock scheduler.
const SECONDS_PER_ACTIVITY: i64 = 45;

pub struct SessionEngine<'a> {
    store: &'a Store,
    config: SessionConfig,
}

impl<'a> SessionEngine<'a> {
    pub fn new(store: &'a Store, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Composes a plan (spec §4.3): exactly 20% of the budget reserved for
    /// review (more only if the due list overruns it — logged, never
    /// dropped), the remainder split between languages by
    /// `language_balance`. A short review warm-up precedes new-item
    /// activities.
    pub async fn plan(
        &self,
        user_id: &str,
        overrides: SessionOverrides,
    ) -> Result<SessionPlan, CoreError> {
        if user_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("user_id must not be empty".into()));
        }

        let user = self.store.get_user(user_id).await?;
        let total_minutes = overrides.daily_minutes.unwrap_or(user.daily_study_minutes).max(1);
        let total_seconds = i64::from(total_minutes) * 60;

        let review_seconds = (total_seconds as f64 * self.config.review_budget_fraction) as i64;
        let review_limit = (review_seconds / SECONDS_PER_ACTIVITY).max(1);

        let now = Utc::now();
        let due = self.store.due_records(user_id, None, now, review_limit).await?;

        let actual_review_seconds = due.len() as i64 * SECONDS_PER_ACTIVITY;
        if actual_review_seconds > review_seconds {
            tracing::warn!(
                user_id,
                planned_review_seconds = review_seconds,
                actual_review_seconds,
                "due list overruns the review budget; serving all due items anyway"
            );
        }

        let remaining_seconds = (total_seconds - actual_review_seconds).max(0);
        let english_seconds = (remaining_seconds as f64 * self.config.language_balance) as i64;
        let japanese_seconds = remaining_seconds - english_seconds;

        let english_level = overrides
            .english_level
            .or(user.preferences.english_level)
            .unwrap_or(EnglishLevel::Cet4);
        let japanese_level = overrides
            .japanese_level
            .or(user.preferences.japanese_level)
            .unwrap_or(JapaneseLevel::N5);

        let mut activities: Vec<Activity> = due
            .into_iter()
            .map(|d| Activity {
                item_id: d.record.item_id,
                kind: d.record.kind,
                mode: ActivityMode::Review,
                status: ActivityStatus::Planned,
                headword: d.headword,
            })
            .collect();

        let english_items = self
            .new_items_for(user_id, Language::English, Level::English(english_level), english_seconds)
            .await?;
        let japanese_items = self
            .new_items_for(user_id, Language::Japanese, Level::Japanese(japanese_level), japanese_seconds)
            .await?;

        activities.extend(english_items);
        activities.extend(japanese_items);

        Ok(SessionPlan {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            planned_minutes: total_minutes,
            activities,
            started_at: now,
        })
    }

    async fn new_items_for(
        &self,
        user_id: &str,
        language: Language,
        level: Level,
        budget_seconds: i64,
    ) -> Result<Vec<Activity>, CoreError> {
        let limit = (budget_seconds / SECONDS_PER_ACTIVITY).max(0);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let items: Vec<Item> = self
            .store
            .select_new_vocabulary(user_id, language, level, true, limit)
            .await?;
        Ok(items
            .into_iter()
            .map(|item| Activity {
                item_id: item.item_id,
                kind: item.kind(),
                mode: ActivityMode::Learn,
                status: ActivityStatus::Planned,
                headword: item.payload.dedup_key().map(str::to_string),
            })
            .collect())
    }

    /// Derives the roll-up from `LearningRecord`s whose `last_review_at` falls
    /// inside the session window (spec §4.3, §4.5): `[session_started_at,
    /// session_ended_at]`. Bounding the window on both ends keeps a later
    /// session's activity (or attempts made after this one ended) out of this
    /// roll-up. Never persisted separately.
    pub async fn evaluate_outcome(
        &self,
        user_id: &str,
        session_started_at: DateTime<Utc>,
        session_ended_at: DateTime<Utc>,
    ) -> Result<SessionOutcome, CoreError> {
        let touched = self
            .store
            .records_touched_between(
                user_id,
                session_started_at - Duration::seconds(1),
                session_ended_at,
            )
            .await?;

        let items_attempted = touched.len() as i64;
        let items_correct = touched
            .iter()
            .filter(|r| r.consecutive_correct > 0 || r.memory_strength >= 0.999)
            .count() as i64;
        let new_items_learned = touched.iter().filter(|r| r.learn_count == 1).count() as i64;
        let items_mastered = touched.iter().filter(|r| r.mastery_level == 5).count() as i64;
        let review_hit_rate = if items_attempted > 0 {
            touched.iter().map(|r| r.memory_strength).sum::<f64>() / items_attempted as f64
        } else {
            0.0
        };

        Ok(SessionOutcome {
            items_attempted,
            items_correct,
            new_items_learned,
            items_mastered,
            review_hit_rate,
        })
    }
}
