//! Operator-facing ingest trigger. Most ingest runs happen via `tutor-cli`;
//! this route exists for deployments that drive ingest from a scheduler
//! that only speaks HTTP. The source file is read from
//! `ingest.sources_path` unless the caller inlines one in the request body.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::ingest::sources::SourceFile;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/run", post(run_ingest))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RunIngestRequest {
    #[serde(default)]
    incremental: bool,
    source_file: Option<SourceFile>,
}

async fn run_ingest(
    State(state): State<AppState>,
    Json(req): Json<RunIngestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let source_file = match req.source_file {
        Some(sf) => sf,
        None => {
            let raw = tokio::fs::read_to_string(&state.config().ingest.sources_path)
                .await
                .map_err(|e| AppError::internal(&format!("failed to read sources file: {e}")))?;
            SourceFile::from_json(&raw)
                .map_err(|e| AppError::bad_request("INVALID_SOURCE_FILE", &e.to_string()))?
        }
    };

    let stats = state
        .api()
        .ingest_run(&source_file, req.incremental)
        .await?;
    Ok(ok(stats))
}
