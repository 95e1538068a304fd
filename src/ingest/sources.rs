//! Source descriptor file (spec §4.4, §6): a JSON document with
//! `english_sources`/`japanese_sources` maps keyed by level tag, plus a shared
//! `crawler_settings` block.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Json,
    Csv,
    Html,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub base_url: String,
    pub level: String,
    pub format: SourceFormat,
    #[serde(default)]
    pub field_aliases: HashMap<String, Vec<String>>,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub backup_builtin: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerSettings {
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_backoff_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub english_sources: HashMap<String, SourceDescriptor>,
    pub japanese_sources: HashMap<String, SourceDescriptor>,
    pub crawler_settings: CrawlerSettings,
}

impl SourceFile {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
