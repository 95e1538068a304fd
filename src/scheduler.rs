//! SM-2-variant state transitions and due-list ordering (spec §4.1).
//!
//! Everything here is a pure function of `(current_record, correct, now)` — no I/O,
//! no fallible paths. The scheduler "never fails independently" (spec §4.1); any error
//! a caller sees originates in the store around it.

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerConfig;
use crate::domain::{DueItem, ItemKind, LearningRecord};

/// Default quality mapping from a boolean attempt outcome (spec §4.1).
pub fn default_quality(correct: bool) -> u8 {
    if correct {
        5
    } else {
        2
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    initial_easiness_factor: f64,
    min_easiness_factor: f64,
    max_interval_days: i64,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            initial_easiness_factor: config.initial_easiness_factor,
            min_easiness_factor: config.min_easiness_factor,
            max_interval_days: config.max_interval_days,
        }
    }

    /// Computes the next learning state given the current record (`None` on a
    /// first attempt), whether the attempt was correct, and the instant of the
    /// attempt. Steps follow spec §4.1 verbatim.
    pub fn compute_next_state(
        &self,
        current: Option<&LearningRecord>,
        user_id: &str,
        item_id: i64,
        kind: ItemKind,
        correct: bool,
        now: DateTime<Utc>,
    ) -> LearningRecord {
        let quality = default_quality(correct);
        let ef_prev = current
            .map(|r| r.easiness_factor)
            .unwrap_or(self.initial_easiness_factor);
        let prev_consecutive = current.map(|r| r.consecutive_correct).unwrap_or(0);
        let prev_interval = current.map(|r| r.scheduled_interval_days()).unwrap_or(0);
        let prev_learn_count = current.map(|r| r.learn_count).unwrap_or(0);
        let prev_correct_count = current.map(|r| r.correct_count).unwrap_or(0);

        let q = f64::from(quality);
        let ef_new = (ef_prev + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)))
            .max(self.min_easiness_factor);

        let (consecutive_correct, interval_days) = if correct {
            let n = prev_consecutive + 1;
            let interval = match n {
                1 => 1,
                2 => 6,
                _ => ((prev_interval as f64) * ef_new).floor() as i64,
            };
            (n, interval.clamp(1, self.max_interval_days))
        } else {
            (0, 1i64.clamp(1, self.max_interval_days))
        };

        let learn_count = prev_learn_count + 1;
        let correct_count = prev_correct_count + i64::from(correct);
        let memory_strength = if learn_count > 0 {
            correct_count as f64 / learn_count as f64
        } else {
            0.0
        };
        let mastery_level = (correct_count / 2).min(5);

        LearningRecord {
            user_id: user_id.to_string(),
            item_id,
            kind,
            learn_count,
            correct_count,
            consecutive_correct,
            easiness_factor: ef_new,
            memory_strength,
            mastery_level,
            last_review_at: now,
            next_review_at: now + Duration::days(interval_days),
        }
    }

    /// The total order the Store's due-list query must also produce (spec §4.1,
    /// §5): `next_review_at asc, memory_strength asc, item_id asc`. Exposed so
    /// in-memory callers (tests, batch runners operating on a pre-fetched page)
    /// can re-sort without a second round trip to the store.
    pub fn order_due(mut items: Vec<DueItem>) -> Vec<DueItem> {
        items.sort_by(|a, b| {
            a.record
                .next_review_at
                .cmp(&b.record.next_review_at)
                .then(
                    a.record
                        .memory_strength
                        .partial_cmp(&b.record.memory_strength)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.record.item_id.cmp(&b.record.item_id))
        });
        items
    }

    /// Bulk-ordering priority score (spec §4.1) — used only by optional batch
    /// runners, never by the per-user due list.
    pub fn priority_score(
        days_overdue: f64,
        avg_recent_performance: f64,
        level_weight: f64,
        quality_score: f64,
    ) -> f64 {
        10.0 * days_overdue.max(0.0) + 5.0 * (1.0 - avg_recent_performance) + level_weight
            + 2.0 * quality_score
    }
}
