//! Content Ingest Pipeline (C4, spec §4.4): fetches remote vocabulary,
//! normalizes it, deduplicates against the store, and inserts in batches.
//! Grounded in `examples/original_source/bilingual_tutor/content/crawler_utils.py`
//! (`UserAgentPool`, `RateLimiter`, `retry_on_failure`, `RobustRequester`) and
//! `storage/content_crawler.py` (`populate_all_content`,
//! `_is_duplicate_vocabulary`, the builtin CET/JLPT fallback lists).

pub mod normalize;
pub mod rate_limit;
pub mod retry;
pub mod seed;
pub mod sources;
pub mod user_agent;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IngestConfig;
use crate::domain::{EnglishLevel, JapaneseLevel, Language};
use crate::store::{Store, StoreError};

use rate_limit::RateLimiter;
use retry::RetryPolicy;
use sources::{SourceDescriptor, SourceFile, SourceFormat};
use user_agent::UserAgentPool;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub retries: u64,
    pub skipped: u64,
    pub elapsed_secs: f64,
    pub requests_per_sec: f64,
}

impl IngestStats {
    fn finalize(&mut self, elapsed: Duration) {
        self.elapsed_secs = elapsed.as_secs_f64();
        self.requests_per_sec = if self.elapsed_secs > 0.0 {
            self.total_requests as f64 / self.elapsed_secs
        } else {
            0.0
        };
    }
}

pub struct IngestPipeline<'a> {
    store: &'a Store,
    http: reqwest::Client,
    config: IngestConfig,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(store: &'a Store, config: IngestConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client builder");
        Self { store, http, config }
    }

    /// Runs ingest over every enabled source in `source_file` (spec §4.4).
    /// A failed source never aborts the run; other sources continue. In
    /// incremental mode (default), duplicates are skipped without a write.
    pub async fn run(
        &self,
        source_file: &SourceFile,
        incremental: bool,
    ) -> Result<IngestStats, IngestError> {
        let started = Instant::now();
        let mut stats = IngestStats::default();

        let mut known_english: HashSet<String> =
            self.store.known_headwords(Language::English).await?.into_iter().collect();
        let mut known_japanese: HashSet<String> =
            self.store.known_headwords(Language::Japanese).await?.into_iter().collect();

        for (level, descriptor) in &source_file.english_sources {
            let Some(english_level) = parse_english_level(level) else {
                continue;
            };
            self.run_source(
                descriptor,
                Language::English,
                crate::domain::Level::English(english_level),
                incremental,
                &mut known_english,
                &mut stats,
            )
            .await;
        }

        for (level, descriptor) in &source_file.japanese_sources {
            let Some(japanese_level) = parse_japanese_level(level) else {
                continue;
            };
            self.run_source(
                descriptor,
                Language::Japanese,
                crate::domain::Level::Japanese(japanese_level),
                incremental,
                &mut known_japanese,
                &mut stats,
            )
            .await;
        }

        stats.finalize(started.elapsed());
        Ok(stats)
    }

    async fn run_source(
        &self,
        descriptor: &SourceDescriptor,
        language: Language,
        level: crate::domain::Level,
        incremental: bool,
        known: &mut HashSet<String>,
        stats: &mut IngestStats,
    ) {
        if !descriptor.enabled {
            return;
        }

        let (fetch_result, retries) = self.fetch_with_policy(descriptor).await;
        stats.total_requests += 1;
        stats.retries += u64::from(retries);

        let raw = match fetch_result {
            Ok(body) => {
                stats.successes += 1;
                body
            }
            Err(e) => {
                stats.failures += 1;
                tracing::warn!(source = %descriptor.name, error = %e, "source fetch failed");
                if descriptor.backup_builtin {
                    self.ingest_builtin(language, level, incremental, known, stats).await;
                }
                return;
            }
        };

        let (items, dropped) = match descriptor.format {
            SourceFormat::Json => {
                let parsed: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
                    Ok(v) => v,
                    Err(_) => {
                        tracing::warn!(source = %descriptor.name, "failed to parse json payload");
                        return;
                    }
                };
                normalize::normalize_json_batch(&parsed, language, level, &descriptor.field_aliases)
            }
            SourceFormat::Csv => {
                normalize::normalize_csv_batch(&raw, language, level, &descriptor.field_aliases)
            }
            SourceFormat::Html => normalize::normalize_html_batch(&raw, language, level),
        };
        stats.skipped += dropped;

        self.dedup_and_insert(items, incremental, known, stats).await;
    }

    async fn ingest_builtin(
        &self,
        language: Language,
        level: crate::domain::Level,
        incremental: bool,
        known: &mut HashSet<String>,
        stats: &mut IngestStats,
    ) {
        let items = match level {
            crate::domain::Level::English(l) => seed::builtin_english(l),
            crate::domain::Level::Japanese(l) => seed::builtin_japanese(l),
        };
        let _ = language;
        self.dedup_and_insert(items, incremental, known, stats).await;
    }

    async fn dedup_and_insert(
        &self,
        items: Vec<crate::store::operations::items::NewItem>,
        incremental: bool,
        known: &mut HashSet<String>,
        stats: &mut IngestStats,
    ) {
        let mut to_insert = Vec::with_capacity(items.len());
        for item in items {
            let key = item.payload.dedup_key().map(str::to_string);
            let is_known = key.as_ref().is_some_and(|k| known.contains(k));

            if incremental && is_known {
                stats.skipped += 1;
                continue;
            }

            if let Some(k) = key {
                known.insert(k);
            }
            to_insert.push(item);
        }

        for chunk in to_insert.chunks(self.config.batch_size) {
            if let Err(e) = self.store.insert_items_batch(chunk).await {
                tracing::error!(error = %e, "batch insert failed; batch rolled back");
                stats.failures += 1;
            }
        }
    }

    /// Fetch contract (spec §4.4): UA rotation, rate limiting, retry with
    /// backoff, bounded timeout — all ahead of a single GET. Returns the
    /// retry count alongside the result so the caller can accumulate it into
    /// `IngestStats.retries`.
    async fn fetch_with_policy(&self, descriptor: &SourceDescriptor) -> (Result<String, IngestError>, u32) {
        let ua_pool = UserAgentPool::new();
        let limiter = RateLimiter::new(descriptor.min_delay_secs, descriptor.max_delay_secs);
        let retry = RetryPolicy::new(
            self.config.max_attempts,
            self.config.retry_initial_delay_ms,
            self.config.retry_backoff_factor,
        );

        let overall_timeout = Duration::from_secs(self.config.request_timeout_secs * u64::from(self.config.max_attempts).max(1));

        match tokio::time::timeout(
            overall_timeout,
            retry.run(|| async {
                limiter.wait().await;
                let mut request = self
                    .http
                    .get(&descriptor.base_url)
                    .header("User-Agent", ua_pool.pick());
                for (key, value) in &descriptor.headers {
                    request = request.header(key.as_str(), value.as_str());
                }

                match request.send().await {
                    Ok(resp) if resp.status().as_u16() == 429 => {
                        Err(IngestError::RateLimited(format!("{} returned 429", descriptor.name)))
                    }
                    Ok(resp) if resp.status().is_success() => resp
                        .text()
                        .await
                        .map_err(|e| IngestError::Transient(e.to_string())),
                    Ok(resp) if resp.status().is_server_error() => {
                        Err(IngestError::Transient(format!("{} returned {}", descriptor.name, resp.status())))
                    }
                    Ok(resp) => Err(IngestError::InvalidSource(format!(
                        "{} returned {}",
                        descriptor.name,
                        resp.status()
                    ))),
                    Err(e) if e.is_timeout() || e.is_connect() => Err(IngestError::Transient(e.to_string())),
                    Err(e) => Err(IngestError::InvalidSource(e.to_string())),
                }
            }),
        )
        .await
        {
            Ok((result, retries)) => (result, retries),
            Err(_) => (
                Err(IngestError::Transient("overall fetch+retry deadline exceeded".into())),
                self.config.max_attempts.saturating_sub(1),
            ),
        }
    }
}

fn parse_english_level(raw: &str) -> Option<EnglishLevel> {
    match raw.to_ascii_lowercase().as_str() {
        "cet-4" | "cet4" => Some(EnglishLevel::Cet4),
        "cet-5" | "cet5" => Some(EnglishLevel::Cet5),
        "cet-6" | "cet6" => Some(EnglishLevel::Cet6),
        _ => None,
    }
}

fn parse_japanese_level(raw: &str) -> Option<JapaneseLevel> {
    match raw.to_ascii_lowercase().as_str() {
        "n5" => Some(JapaneseLevel::N5),
        "n4" => Some(JapaneseLevel::N4),
        "n3" => Some(JapaneseLevel::N3),
        "n2" => Some(JapaneseLevel::N2),
        "n1" => Some(JapaneseLevel::N1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[tokio::test]
    async fn builtin_fallback_is_idempotent_in_incremental_mode() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let pipeline = IngestPipeline::new(&store, IngestConfig::default());

        let mut known = HashSet::new();
        let mut stats = IngestStats::default();
        pipeline
            .ingest_builtin(
                Language::English,
                crate::domain::Level::English(EnglishLevel::Cet4),
                true,
                &mut known,
                &mut stats,
            )
            .await;
        let first_inserted = stats.skipped;

        let mut stats2 = IngestStats::default();
        pipeline
            .ingest_builtin(
                Language::English,
                crate::domain::Level::English(EnglishLevel::Cet4),
                true,
                &mut known,
                &mut stats2,
            )
            .await;

        assert_eq!(first_inserted, 0);
        assert_eq!(
            stats2.skipped as usize,
            seed::builtin_english(EnglishLevel::Cet4).len()
        );
    }
}
