//! Thin HTTP bindings for the Service API (C6): each handler validates
//! nothing itself — that lives in `ServiceApi` — it only deserializes the
//! request and forwards the result through `crate::response`.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Json, Router};
use axum::routing::{get, post};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::service::{
    GetDueRequest, ProgressRequest, StartSessionRequest, SubmitAttemptRequest,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(start_session))
        .route("/due", get(get_due))
        .route("/attempts", post(submit_attempt))
        .route("/progress", get(progress))
}

async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let plan = state.api().start_session(req).await?;
    Ok(ok(plan))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DueQuery {
    user_id: String,
    kind: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

async fn get_due(
    State(state): State<AppState>,
    Query(q): Query<DueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let resp = state
        .api()
        .get_due(GetDueRequest {
            user_id: q.user_id,
            kind: q.kind,
            limit: q.limit,
        })
        .await?;
    Ok(ok(resp))
}

async fn submit_attempt(
    State(state): State<AppState>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.api().submit_attempt(req).await?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressQuery {
    user_id: String,
    timeframe_days: Option<i64>,
}

async fn progress(
    State(state): State<AppState>,
    Query(q): Query<ProgressQuery>,
) -> Result<impl IntoResponse, AppError> {
    let resp = state
        .api()
        .progress(ProgressRequest {
            user_id: q.user_id,
            timeframe_days: q.timeframe_days,
        })
        .await?;
    Ok(ok(resp))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, StoreConfig};
    use crate::service::ServiceApi;
    use crate::store::Store;
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

    async fn test_state() -> AppState {
        let store = Store::open_in_memory(&StoreConfig::default()).await.unwrap();
        store.run_migrations().await.unwrap();
        let config = test_config();
        let api = ServiceApi::new(store, config.clone());
        AppState::new(api, &config)
    }

    #[tokio::test]
    async fn get_due_without_user_id_is_rejected() {
        let state = test_state().await;
        let app = router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/due?limit=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn submit_attempt_with_unknown_kind_returns_bad_request() {
        let state = test_state().await;
        let app = router().with_state(state);

        let body = serde_json::json!({
            "userId": "U",
            "itemId": 1,
            "kind": "audio",
            "correct": true
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/attempts")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
