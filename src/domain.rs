//! Core data model (spec §3): items, learning records, users, and the small value
//! types shared across the store, scheduler, session engine, and service API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Vocabulary,
    Grammar,
    Reading,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Vocabulary => "vocabulary",
            ItemKind::Grammar => "grammar",
            ItemKind::Reading => "reading",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "vocabulary" => Ok(ItemKind::Vocabulary),
            "grammar" => Ok(ItemKind::Grammar),
            "reading" => Ok(ItemKind::Reading),
            other => Err(CoreError::InvalidInput(format!("unknown kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Japanese,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Japanese => "japanese",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "english" => Ok(Language::English),
            "japanese" => Ok(Language::Japanese),
            other => Err(CoreError::InvalidInput(format!("unknown language: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnglishLevel {
    Cet4,
    Cet5,
    Cet6,
}

impl EnglishLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnglishLevel::Cet4 => "cet-4",
            EnglishLevel::Cet5 => "cet-5",
            EnglishLevel::Cet6 => "cet-6",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cet-4" | "cet4" => Some(EnglishLevel::Cet4),
            "cet-5" | "cet5" => Some(EnglishLevel::Cet5),
            "cet-6" | "cet6" => Some(EnglishLevel::Cet6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JapaneseLevel {
    N5,
    N4,
    N3,
    N2,
    N1,
}

impl JapaneseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            JapaneseLevel::N5 => "n5",
            JapaneseLevel::N4 => "n4",
            JapaneseLevel::N3 => "n3",
            JapaneseLevel::N2 => "n2",
            JapaneseLevel::N1 => "n1",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "n5" => Some(JapaneseLevel::N5),
            "n4" => Some(JapaneseLevel::N4),
            "n3" => Some(JapaneseLevel::N3),
            "n2" => Some(JapaneseLevel::N2),
            "n1" => Some(JapaneseLevel::N1),
            _ => None,
        }
    }
}

/// A level tag validated against its language at construction time, so an
/// invalid `(language, level)` pair is unrepresentable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level {
    English(EnglishLevel),
    Japanese(JapaneseLevel),
}

impl Level {
    pub fn parse(language: Language, raw: &str) -> Result<Self, CoreError> {
        let lower = raw.to_ascii_lowercase();
        match language {
            Language::English => EnglishLevel::parse(&lower).map(Level::English),
            Language::Japanese => JapaneseLevel::parse(&lower).map(Level::Japanese),
        }
        .ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "level '{raw}' is not valid for language {}",
                language.as_str()
            ))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::English(l) => l.as_str(),
            Level::Japanese(l) => l.as_str(),
        }
    }

    pub fn language(&self) -> Language {
        match self {
            Level::English(_) => Language::English,
            Level::Japanese(_) => Language::Japanese,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemPayload {
    Vocabulary {
        headword: String,
        reading: Option<String>,
        meaning: String,
        example: Option<String>,
    },
    Grammar {
        pattern: String,
        explanation: String,
        examples: Vec<String>,
    },
    Reading {
        title: String,
        body: String,
    },
}

impl ItemPayload {
    /// The field the ingest pipeline's uniqueness constraint keys on: `headword`
    /// for vocabulary, `name` (mapped onto `pattern`) for grammar. Reading
    /// passages have no uniqueness constraint in spec §3.
    pub fn dedup_key(&self) -> Option<&str> {
        match self {
            ItemPayload::Vocabulary { headword, .. } => Some(headword),
            ItemPayload::Grammar { pattern, .. } => Some(pattern),
            ItemPayload::Reading { .. } => None,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemPayload::Vocabulary { .. } => ItemKind::Vocabulary,
            ItemPayload::Grammar { .. } => ItemKind::Grammar,
            ItemPayload::Reading { .. } => ItemKind::Reading,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub item_id: i64,
    pub language: Language,
    pub level: Level,
    #[serde(flatten)]
    pub payload: ItemPayload,
    pub audio_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }
}

/// Per-(user, item) mnemonic state (spec §3). Constructed only by the
/// scheduler; the store persists it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecord {
    pub user_id: String,
    pub item_id: i64,
    pub kind: ItemKind,
    pub learn_count: i64,
    pub correct_count: i64,
    pub consecutive_correct: i64,
    pub easiness_factor: f64,
    pub memory_strength: f64,
    pub mastery_level: i64,
    pub last_review_at: DateTime<Utc>,
    pub next_review_at: DateTime<Utc>,
}

impl LearningRecord {
    /// Whole-day interval this record is currently scheduled on, derived from
    /// the persisted timestamps rather than recomputed from attempt history
    /// (spec §9, open question 3).
    pub fn scheduled_interval_days(&self) -> i64 {
        let span = self.next_review_at - self.last_review_at;
        span.num_days().max(1)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

/// A due record joined with enough of its item's payload to render a review
/// without a second query (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueItem {
    pub record: LearningRecord,
    pub headword: Option<String>,
    pub reading: Option<String>,
    pub meaning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPreferences {
    pub english_level: Option<EnglishLevel>,
    pub japanese_level: Option<JapaneseLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub credential_hash: String,
    pub preferences: LevelPreferences,
    pub daily_study_minutes: u32,
    pub created_at: DateTime<Utc>,
}

/// A reference to audio owned and served by the (out-of-scope) audio
/// subsystem; the core stores only this pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAsset {
    pub item_id: i64,
    pub local_path: String,
    pub quality: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_rejects_mismatched_language() {
        assert!(Level::parse(Language::English, "n3").is_err());
        assert!(Level::parse(Language::Japanese, "cet-4").is_err());
    }

    #[test]
    fn level_accepts_matching_language() {
        assert_eq!(
            Level::parse(Language::English, "CET-6").unwrap(),
            Level::English(EnglishLevel::Cet6)
        );
        assert_eq!(
            Level::parse(Language::Japanese, "n1").unwrap(),
            Level::Japanese(JapaneseLevel::N1)
        );
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [ItemKind::Vocabulary, ItemKind::Grammar, ItemKind::Reading] {
            assert_eq!(ItemKind::parse(kind.as_str()).unwrap(), kind);
        }
    }
}
