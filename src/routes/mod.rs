pub mod health;
pub mod ingest;
pub mod learning;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::BoxError;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::response::AppError;
use crate::state::AppState;

/// Maximum request body size: 1 MiB. Ingest bodies can carry an inlined
/// source file, so this is generous relative to the learning endpoints.
const MAX_BODY_SIZE: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let deadline = Duration::from_secs(state.config().request_deadline_secs);

    let api_routes = Router::new()
        .nest("/learning", learning::router())
        .nest("/ingest", ingest::router())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_deadline_exceeded))
                .timeout(deadline),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Converts a `tower::timeout::error::Elapsed` (spec §7 `Timeout`) into the
/// same error body every other handler produces.
async fn handle_deadline_exceeded(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::from(crate::error::CoreError::Timeout(
            "request deadline exceeded".to_string(),
        ))
    } else {
        AppError::internal(&err.to_string())
    }
}
