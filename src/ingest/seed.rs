//! Built-in seed vocabulary (spec §4.4), used as the fallback when a remote
//! source exhausts its retries and `backup_builtin` is set. Grounded in
//! `_get_builtin_cet_vocabulary`/`_get_builtin_jlpt_vocabulary` — a small
//! representative sample per level, not the full source word list.

use crate::domain::{EnglishLevel, ItemPayload, JapaneseLevel, Language, Level};
use crate::store::operations::items::NewItem;

struct Seed {
    word: &'static str,
    reading: &'static str,
    meaning: &'static str,
    example: &'static str,
}

fn item(language: Language, level: Level, seed: &Seed) -> NewItem {
    NewItem {
        language,
        level,
        payload: ItemPayload::Vocabulary {
            headword: seed.word.to_string(),
            reading: (!seed.reading.is_empty()).then(|| seed.reading.to_string()),
            meaning: seed.meaning.to_string(),
            example: (!seed.example.is_empty()).then(|| seed.example.to_string()),
        },
        audio_ref: None,
    }
}

pub fn builtin_english(level: EnglishLevel) -> Vec<NewItem> {
    let seeds: &[Seed] = match level {
        EnglishLevel::Cet4 => &[
            Seed { word: "abandon", reading: "/e'banden/", meaning: "v. to give up completely", example: "He abandoned his car in the snow." },
            Seed { word: "ability", reading: "/e'bIleti/", meaning: "n. the capacity to do something", example: "She has the ability to solve problems." },
            Seed { word: "abroad", reading: "/e'brO:d/", meaning: "adv. in or to a foreign country", example: "He studied abroad for a year." },
        ],
        EnglishLevel::Cet5 => &[
            Seed { word: "abundant", reading: "/e'bVndent/", meaning: "adj. existing in large quantities", example: "The region has abundant natural resources." },
            Seed { word: "accelerate", reading: "/ek'selereIt/", meaning: "v. to increase in speed", example: "The car accelerated down the highway." },
        ],
        EnglishLevel::Cet6 => &[
            Seed { word: "abstain", reading: "/eb'steIn/", meaning: "v. to choose not to do something", example: "She abstained from voting." },
            Seed { word: "acquiesce", reading: "/ækwi'es/", meaning: "v. to accept something reluctantly", example: "He acquiesced to their demands." },
        ],
    };
    seeds
        .iter()
        .map(|s| item(Language::English, Level::English(level), s))
        .collect()
}

pub fn builtin_japanese(level: JapaneseLevel) -> Vec<NewItem> {
    let seeds: &[Seed] = match level {
        JapaneseLevel::N5 => &[
            Seed { word: "\u{3042}\u{308a}\u{304c}\u{3068}\u{3046}", reading: "arigatou", meaning: "thank you", example: "" },
            Seed { word: "\u{304a}\u{306f}\u{3088}\u{3046}", reading: "ohayou", meaning: "good morning", example: "" },
        ],
        JapaneseLevel::N4 => &[
            Seed { word: "\u{7d99}\u{7d9a}", reading: "keizoku", meaning: "continuation", example: "" },
        ],
        JapaneseLevel::N3 => &[
            Seed { word: "\u{5224}\u{65ad}", reading: "handan", meaning: "judgment", example: "" },
        ],
        JapaneseLevel::N2 => &[
            Seed { word: "\u{6982}\u{5ff5}", reading: "gainen", meaning: "concept", example: "" },
        ],
        JapaneseLevel::N1 => &[
            Seed { word: "\u{66d6}\u{6627}", reading: "aimai", meaning: "ambiguous", example: "" },
        ],
    };
    seeds
        .iter()
        .map(|s| item(Language::Japanese, Level::Japanese(level), s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_level_has_a_seed_list() {
        for level in [EnglishLevel::Cet4, EnglishLevel::Cet5, EnglishLevel::Cet6] {
            assert!(!builtin_english(level).is_empty());
        }
        for level in [
            JapaneseLevel::N5,
            JapaneseLevel::N4,
            JapaneseLevel::N3,
            JapaneseLevel::N2,
            JapaneseLevel::N1,
        ] {
            assert!(!builtin_japanese(level).is_empty());
        }
    }
}
