//! Service API (C6, spec §4.6): the single, transport-neutral surface that
//! front ends call. Validation (unknown kind/level, negative limit, empty
//! user_id) lives here, before anything reaches the store.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::assessment::{AssessmentSurface, AttemptResult, UserLocks};
use crate::config::Config;
use crate::domain::{DueItem, ItemKind};
use crate::error::CoreError;
use crate::ingest::sources::SourceFile;
use crate::ingest::{IngestPipeline, IngestStats};
use crate::session::{SessionEngine, SessionOutcome, SessionOverrides, SessionPlan};
use crate::store::Store;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub user_id: String,
    pub english_level: Option<String>,
    pub japanese_level: Option<String>,
    pub daily_minutes: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDueRequest {
    pub user_id: String,
    pub kind: Option<String>,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueResponse {
    pub items: Vec<DueItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub user_id: String,
    pub item_id: i64,
    pub kind: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub user_id: String,
    pub timeframe_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub due_count: i64,
    pub mastery_distribution: Vec<(i64, i64)>,
    pub recent_activity_count: i64,
    pub total_learn_count: i64,
    pub total_correct_count: i64,
}

pub struct ServiceApi {
    store: Store,
    config: Config,
    user_locks: Arc<UserLocks>,
}

impl ServiceApi {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store,
            config,
            user_locks: Arc::new(UserLocks::default()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn require_user_id(user_id: &str) -> Result<(), CoreError> {
        if user_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("user_id must not be empty".into()));
        }
        Ok(())
    }

    pub async fn start_session(&self, req: StartSessionRequest) -> Result<SessionPlan, CoreError> {
        Self::require_user_id(&req.user_id)?;

        let english_level = req
            .english_level
            .as_deref()
            .map(|raw| crate::domain::Level::parse(crate::domain::Language::English, raw))
            .transpose()?
            .map(|l| match l {
                crate::domain::Level::English(e) => e,
                _ => unreachable!(),
            });
        let japanese_level = req
            .japanese_level
            .as_deref()
            .map(|raw| crate::domain::Level::parse(crate::domain::Language::Japanese, raw))
            .transpose()?
            .map(|l| match l {
                crate::domain::Level::Japanese(j) => j,
                _ => unreachable!(),
            });

        let overrides = SessionOverrides {
            english_level,
            japanese_level,
            daily_minutes: req.daily_minutes,
        };

        let engine = SessionEngine::new(&self.store, self.config.session.clone());
        match engine.plan(&req.user_id, overrides).await {
            Ok(plan) => Ok(plan),
            Err(e) => {
                tracing::warn!(user_id = %req.user_id, error = %e, "session start failed, returning empty plan");
                Ok(SessionPlan {
                    session_id: uuid::Uuid::new_v4().to_string(),
                    user_id: req.user_id,
                    planned_minutes: 0,
                    activities: Vec::new(),
                    started_at: Utc::now(),
                })
            }
        }
    }

    pub async fn get_due(&self, req: GetDueRequest) -> Result<DueResponse, CoreError> {
        Self::require_user_id(&req.user_id)?;
        if req.limit < 0 {
            return Err(CoreError::InvalidInput("limit must not be negative".into()));
        }
        let kind = req.kind.as_deref().map(ItemKind::parse).transpose()?;
        let now = Utc::now();
        let items = self.store.due_records(&req.user_id, kind, now, req.limit).await?;
        Ok(DueResponse { items })
    }

    pub async fn submit_attempt(&self, req: SubmitAttemptRequest) -> Result<AttemptResult, CoreError> {
        Self::require_user_id(&req.user_id)?;
        let kind = ItemKind::parse(&req.kind)?;
        let surface = AssessmentSurface::new(&self.store, &self.config.scheduler, self.user_locks.clone());
        surface
            .record_attempt(&req.user_id, req.item_id, kind, req.correct)
            .await
    }

    pub async fn progress(&self, req: ProgressRequest) -> Result<ProgressResponse, CoreError> {
        Self::require_user_id(&req.user_id)?;
        let now = Utc::now();
        let since = now - chrono::Duration::days(req.timeframe_days.unwrap_or(7));

        let due_count = self.store.due_count(&req.user_id, now).await?;
        let mastery_distribution = self.store.mastery_distribution(&req.user_id).await?;
        let recent_activity_count = self.store.recent_activity_count(&req.user_id, since).await?;
        let (total_learn_count, total_correct_count) =
            self.store.total_learn_and_correct(&req.user_id).await?;

        Ok(ProgressResponse {
            due_count,
            mastery_distribution,
            recent_activity_count,
            total_learn_count,
            total_correct_count,
        })
    }

    /// Rolls up a session's outcome over `[session_started_at,
    /// session_ended_at]`. Callers without a natural end point (e.g. the
    /// session is still open) should pass `Utc::now()`, but a caller that
    /// knows the plan's `planned_minutes` should prefer
    /// `session_started_at + Duration::minutes(planned_minutes)` so a second,
    /// later session's activity can't leak into this roll-up.
    pub async fn evaluate_session_outcome(
        &self,
        user_id: &str,
        session_started_at: chrono::DateTime<Utc>,
        session_ended_at: chrono::DateTime<Utc>,
    ) -> Result<SessionOutcome, CoreError> {
        Self::require_user_id(user_id)?;
        let engine = SessionEngine::new(&self.store, self.config.session.clone());
        engine
            .evaluate_outcome(user_id, session_started_at, session_ended_at)
            .await
    }

    pub async fn ingest_run(
        &self,
        source_file: &SourceFile,
        incremental: bool,
    ) -> Result<IngestStats, CoreError> {
        let pipeline = IngestPipeline::new(&self.store, self.config.ingest.clone());
        let stats = pipeline.run(source_file, incremental).await?;
        let stats_json = serde_json::to_string(&stats).unwrap_or_default();
        self.store.record_ingest_run(Utc::now(), &stats_json).await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreConfig};
    use std::net::{IpAddr, Ipv4Addr};

    fn test_config() -> Config {
        Config {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 0,
            log_level: "info".into(),
            enable_file_logs: false,
            log_dir: "./logs".into(),
            database_path: ":memory:".into(),
            cors_origin: "*".into(),
            store: StoreConfig::default(),
            scheduler: Default::default(),
            session: Default::default(),
            ingest: Default::default(),
            request_deadline_secs: 10,
        }
    }

    #[tokio::test]
    async fn get_due_rejects_unknown_kind() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let api = ServiceApi::new(store, test_config());

        let err = api
            .get_due(GetDueRequest {
                user_id: "U".into(),
                kind: Some("audio".into()),
                limit: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_due_rejects_negative_limit() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let api = ServiceApi::new(store, test_config());

        let err = api
            .get_due(GetDueRequest {
                user_id: "U".into(),
                kind: None,
                limit: -1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn submit_attempt_rejects_unknown_kind() {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let api = ServiceApi::new(store, test_config());

        let err = api
            .submit_attempt(SubmitAttemptRequest {
                user_id: "U".into(),
                item_id: 1,
                kind: "audio".into(),
                correct: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
