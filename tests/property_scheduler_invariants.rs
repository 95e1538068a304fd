//! Property tests for the SM-2-variant scheduler (spec.md §8, properties
//! 1-5), in the style of the teacher's `tests/property_amas_invariants.rs`.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use tutor_core::config::SchedulerConfig;
use tutor_core::domain::{ItemKind, LearningRecord};
use tutor_core::scheduler::Scheduler;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn replay(attempts: &[bool]) -> Vec<LearningRecord> {
    let scheduler = Scheduler::new(&SchedulerConfig::default());
    let mut history = Vec::with_capacity(attempts.len());
    let mut current: Option<LearningRecord> = None;
    let mut now = base_time();

    for &correct in attempts {
        let next = scheduler.compute_next_state(
            current.as_ref(),
            "U",
            1,
            ItemKind::Vocabulary,
            correct,
            now,
        );
        now = next.next_review_at;
        history.push(next.clone());
        current = Some(next);
    }
    history
}

proptest! {
    #[test]
    fn pt_sm2_bounds_hold_after_any_sequence(attempts in prop::collection::vec(any::<bool>(), 0..60)) {
        for record in replay(&attempts) {
            prop_assert!(record.easiness_factor >= 1.3 - 1e-9);
            let interval = (record.next_review_at - record.last_review_at).num_days();
            prop_assert!((1..=365).contains(&interval));
        }
    }

    #[test]
    fn pt_counts_are_monotone_and_correct_never_exceeds_learn(
        attempts in prop::collection::vec(any::<bool>(), 0..60)
    ) {
        let history = replay(&attempts);
        let mut prev_learn = 0;
        let mut prev_correct = 0;
        for record in &history {
            prop_assert!(record.learn_count >= prev_learn);
            prop_assert!(record.correct_count >= prev_correct);
            prop_assert!(record.correct_count <= record.learn_count);
            prev_learn = record.learn_count;
            prev_correct = record.correct_count;
        }
    }

    #[test]
    fn pt_mastery_level_derives_from_correct_count(
        attempts in prop::collection::vec(any::<bool>(), 0..60)
    ) {
        for record in replay(&attempts) {
            prop_assert_eq!(record.mastery_level, (record.correct_count / 2).min(5));
        }
    }

    #[test]
    fn pt_memory_strength_is_correct_over_learn(
        attempts in prop::collection::vec(any::<bool>(), 1..60)
    ) {
        for record in replay(&attempts) {
            let expected = record.correct_count as f64 / record.learn_count as f64;
            prop_assert!((record.memory_strength - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn pt_interval_rule_matches_consecutive_correct_streaks(
        leading_correct in 0usize..5,
    ) {
        // `leading_correct` consecutive correct attempts, then a flip to
        // incorrect: checks the 1/6/previous*EF/reset-to-1 rule (spec.md §4.1
        // step 2-3) without hardcoding EF's floating-point trajectory.
        let scheduler = Scheduler::new(&SchedulerConfig::default());
        let mut current: Option<LearningRecord> = None;
        let mut now = base_time();
        let mut prev_interval = 0i64;

        for i in 0..leading_correct {
            let next = scheduler.compute_next_state(current.as_ref(), "U", 1, ItemKind::Vocabulary, true, now);
            let interval = (next.next_review_at - next.last_review_at).num_days();
            match i {
                0 => prop_assert_eq!(interval, 1),
                1 => prop_assert_eq!(interval, 6),
                _ => prop_assert_eq!(interval, (prev_interval as f64 * next.easiness_factor).floor() as i64),
            }
            prev_interval = interval;
            now = next.next_review_at;
            current = Some(next);
        }

        let after_incorrect = scheduler.compute_next_state(current.as_ref(), "U", 1, ItemKind::Vocabulary, false, now);
        prop_assert_eq!(after_incorrect.consecutive_correct, 0);
        prop_assert_eq!(
            (after_incorrect.next_review_at - after_incorrect.last_review_at).num_days(),
            1
        );
    }
}
