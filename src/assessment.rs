//! Assessment Surface (C5, spec §4.5): accepts an attempt outcome and returns
//! the updated learning state plus a feedback descriptor for the front end to
//! render.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::SchedulerConfig;
use crate::domain::{ItemKind, LearningRecord};
use crate::error::CoreError;
use crate::scheduler::Scheduler;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackShape {
    pub severity: Severity,
    pub message_id_en: &'static str,
    pub message_id_ja: &'static str,
    pub recorded: bool,
}

impl FeedbackShape {
    /// Derived purely from `correct` and the new `memory_strength` (spec §4.5).
    fn from_outcome(correct: bool, memory_strength: f64) -> Self {
        let severity = if !correct {
            Severity::Poor
        } else if memory_strength >= 0.9 {
            Severity::Excellent
        } else if memory_strength >= 0.7 {
            Severity::Good
        } else {
            Severity::Fair
        };

        let (en, ja) = match severity {
            Severity::Excellent => ("feedback.excellent", "素晴らしい"),
            Severity::Good => ("feedback.good", "良いです"),
            Severity::Fair => ("feedback.fair", "まあまあです"),
            Severity::Poor => ("feedback.poor", "もう一度頑張りましょう"),
        };

        FeedbackShape {
            severity,
            message_id_en: en,
            message_id_ja: ja,
            recorded: true,
        }
    }

    fn not_recorded() -> Self {
        FeedbackShape {
            severity: Severity::Poor,
            message_id_en: "feedback.not_recorded",
            message_id_ja: "feedback.not_recorded",
            recorded: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub record: LearningRecord,
    pub next_review_at: chrono::DateTime<Utc>,
    pub feedback: FeedbackShape,
}

/// Per-user locks serializing `record_attempt` (spec §5): the equivalent-to-
/// snapshot-isolation device layered atop the store's single-row upsert so
/// an attempt always observes the effects of the user's immediately
/// preceding one.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut guard = self.locks.lock().await;
        guard
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct AssessmentSurface<'a> {
    store: &'a Store,
    scheduler: Scheduler,
    locks: Arc<UserLocks>,
}

impl<'a> AssessmentSurface<'a> {
    pub fn new(store: &'a Store, scheduler_config: &SchedulerConfig, locks: Arc<UserLocks>) -> Self {
        Self {
            store,
            scheduler: Scheduler::new(scheduler_config),
            locks,
        }
    }

    pub async fn record_attempt(
        &self,
        user_id: &str,
        item_id: i64,
        kind: ItemKind,
        correct: bool,
    ) -> Result<AttemptResult, CoreError> {
        if user_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("user_id must not be empty".into()));
        }

        let user_lock = self.locks.acquire(user_id).await;
        let _guard = user_lock.lock().await;

        let now = Utc::now();
        let current = self.store.get_learning_record(user_id, item_id, kind).await?;
        let updated = self
            .scheduler
            .compute_next_state(current.as_ref(), user_id, item_id, kind, correct, now);

        if let Err(e) = self.store.upsert_learning_record(&updated).await {
            tracing::error!(user_id, item_id, error = %e, "attempt upsert failed");
            let unchanged = current.unwrap_or_else(|| updated.clone());
            return Ok(AttemptResult {
                next_review_at: unchanged.next_review_at,
                feedback: FeedbackShape::not_recorded(),
                record: unchanged,
            });
        }

        let feedback = FeedbackShape::from_outcome(correct, updated.memory_strength);
        Ok(AttemptResult {
            next_review_at: updated.next_review_at,
            record: updated,
            feedback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[tokio::test]
    async fn first_attempt_creates_a_record_with_feedback() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let locks = Arc::new(UserLocks::default());
        let surface = AssessmentSurface::new(&store, &SchedulerConfig::default(), locks);

        let result = surface
            .record_attempt("U", 1, ItemKind::Vocabulary, true)
            .await
            .unwrap();
        assert_eq!(result.record.learn_count, 1);
        assert!(result.feedback.recorded);
    }

    #[tokio::test]
    async fn rejects_empty_user_id() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let locks = Arc::new(UserLocks::default());
        let surface = AssessmentSurface::new(&store, &SchedulerConfig::default(), locks);

        let err = surface
            .record_attempt("", 1, ItemKind::Vocabulary, true)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn sequential_attempts_observe_each_others_effects() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let locks = Arc::new(UserLocks::default());
        let surface = AssessmentSurface::new(&store, &SchedulerConfig::default(), locks);

        surface.record_attempt("U", 1, ItemKind::Vocabulary, true).await.unwrap();
        let second = surface.record_attempt("U", 1, ItemKind::Vocabulary, true).await.unwrap();
        assert_eq!(second.record.consecutive_correct, 2);
        assert_eq!(second.record.learn_count, 2);
    }
}
