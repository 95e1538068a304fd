//! Spec.md §8 property 9 / scenario S6: running ingest twice in incremental
//! mode leaves the item count unchanged after the first run. The source's
//! `base_url` points at a closed local port so the fetch fails fast and
//! falls back to the builtin seed list — no network access required.

use std::collections::HashMap;

use tutor_core::config::{IngestConfig, StoreConfig};
use tutor_core::domain::{EnglishLevel, Language, Level};
use tutor_core::ingest::sources::{CrawlerSettings, SourceDescriptor, SourceFile, SourceFormat};
use tutor_core::ingest::IngestPipeline;
use tutor_core::store::Store;

fn unreachable_source_file() -> SourceFile {
    let descriptor = SourceDescriptor {
        name: "cet4-unreachable".to_string(),
        base_url: "http://127.0.0.1:9/vocab.json".to_string(),
        level: "cet-4".to_string(),
        format: SourceFormat::Json,
        field_aliases: HashMap::new(),
        min_delay_secs: 0.0,
        max_delay_secs: 0.0,
        headers: HashMap::new(),
        enabled: true,
        backup_builtin: true,
    };

    let mut english_sources = HashMap::new();
    english_sources.insert("cet-4".to_string(), descriptor);

    SourceFile {
        english_sources,
        japanese_sources: HashMap::new(),
        crawler_settings: CrawlerSettings {
            request_timeout_secs: 1,
            max_attempts: 1,
            retry_initial_delay_ms: 1,
            retry_backoff_factor: 1.0,
        },
    }
}

fn fast_ingest_config() -> IngestConfig {
    IngestConfig {
        request_timeout_secs: 1,
        max_attempts: 1,
        retry_initial_delay_ms: 1,
        retry_backoff_factor: 1.0,
        min_delay_secs: 0.0,
        max_delay_secs: 0.0,
        batch_size: 100,
        sources_path: "./config/sources.json".to_string(),
    }
}

#[tokio::test]
async fn rerunning_incremental_ingest_is_idempotent() {
    let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
    store.run_migrations().await.unwrap();

    let pipeline = IngestPipeline::new(&store, fast_ingest_config());
    let source_file = unreachable_source_file();

    let first = pipeline.run(&source_file, true).await.unwrap();
    let items_after_first = store
        .list_items(
            tutor_core::domain::ItemKind::Vocabulary,
            Language::English,
            Some(Level::English(EnglishLevel::Cet4)),
        )
        .await
        .unwrap();
    assert!(!items_after_first.is_empty());
    assert_eq!(first.skipped, 0);

    let second = pipeline.run(&source_file, true).await.unwrap();
    let items_after_second = store
        .list_items(
            tutor_core::domain::ItemKind::Vocabulary,
            Language::English,
            Some(Level::English(EnglishLevel::Cet4)),
        )
        .await
        .unwrap();

    assert_eq!(items_after_first.len(), items_after_second.len());
    assert_eq!(second.skipped as usize, items_after_first.len());
}
