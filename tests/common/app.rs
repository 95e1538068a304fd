use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use chrono::Utc;
use tempfile::TempDir;

use tutor_core::config::{Config, IngestConfig, SchedulerConfig, SessionConfig, StoreConfig};
use tutor_core::domain::{
    EnglishLevel, ItemPayload, JapaneseLevel, Language, Level, LevelPreferences, User,
};
use tutor_core::routes::build_router;
use tutor_core::service::ServiceApi;
use tutor_core::state::AppState;
use tutor_core::store::operations::items::NewItem;
use tutor_core::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

fn test_config(database_path: String) -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        port: 0,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        database_path,
        cors_origin: "http://localhost:5173".to_string(),
        store: StoreConfig::default(),
        scheduler: SchedulerConfig::default(),
        session: SessionConfig::default(),
        ingest: IngestConfig::default(),
        request_deadline_secs: 10,
    }
}

/// Spawns a full router against a fresh, file-backed sqlite store in a
/// tempdir — the pack's pattern for integration tests that need a real
/// store rather than `:memory:` (see the teacher's `tests/common/app.rs`,
/// which does the same against its own embedded store).
pub async fn spawn_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let db_path = temp_dir.path().join("tutor-test.sqlite3");
    let config = test_config(db_path.to_string_lossy().to_string());

    let store = Store::open(&config.database_path, &config.store)
        .await
        .expect("open store");
    store.run_migrations().await.expect("run migrations");

    let api = ServiceApi::new(store, config.clone());
    let state = AppState::new(api, &config);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        _temp_dir: temp_dir,
    }
}

/// Seeds a user plus one vocabulary item per language, matching the
/// smallest fixture `start_session`/`submit_attempt` need to do anything
/// useful.
pub async fn seed_user_and_items(app: &TestApp, user_id: &str) -> (i64, i64) {
    let store = app.state.api().store();

    store
        .upsert_user(&User {
            user_id: user_id.to_string(),
            credential_hash: "unused-in-core".to_string(),
            preferences: LevelPreferences {
                english_level: Some(EnglishLevel::Cet4),
                japanese_level: Some(JapaneseLevel::N5),
            },
            daily_study_minutes: 30,
            created_at: Utc::now(),
        })
        .await
        .expect("seed user");

    let ids = store
        .insert_items_batch(&[
            NewItem {
                language: Language::English,
                level: Level::English(EnglishLevel::Cet4),
                payload: ItemPayload::Vocabulary {
                    headword: "abandon".to_string(),
                    reading: None,
                    meaning: "to give up completely".to_string(),
                    example: None,
                },
                audio_ref: None,
            },
            NewItem {
                language: Language::Japanese,
                level: Level::Japanese(JapaneseLevel::N5),
                payload: ItemPayload::Vocabulary {
                    headword: "\u{3042}\u{308a}\u{304c}\u{3068}\u{3046}".to_string(),
                    reading: Some("arigatou".to_string()),
                    meaning: "thank you".to_string(),
                    example: None,
                },
                audio_ref: None,
            },
        ])
        .await
        .expect("seed items");

    (ids[0], ids[1])
}
