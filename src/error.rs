//! Error taxonomy shared by every core component (spec §7).
//!
//! Each layer raises its own typed error (`StoreError`, `IngestError`, ...); this module
//! is where they collapse into the seven kinds the Service API and transport layer
//! reason about. Nothing here talks HTTP — that mapping lives in `crate::response`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("data corruption detected: {0}")]
    Corrupt(String),

    #[error("request deadline exceeded: {0}")]
    Timeout(String),
}

impl CoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "InvalidInput",
            CoreError::NotFound(_) => "NotFound",
            CoreError::Conflict(_) => "Conflict",
            CoreError::Transient(_) => "Transient",
            CoreError::RateLimited(_) => "RateLimited",
            CoreError::Corrupt(_) => "Corrupt",
            CoreError::Timeout(_) => "Timeout",
        }
    }

    /// Whether a caller may retry the operation a bounded number of times.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_) | CoreError::RateLimited(_))
    }
}

impl From<crate::store::StoreError> for CoreError {
    fn from(value: crate::store::StoreError) -> Self {
        use crate::store::StoreError as SE;
        match value {
            SE::Validation(msg) => CoreError::InvalidInput(msg),
            SE::NotFound { entity, key } => {
                CoreError::NotFound(format!("{entity} not found: {key}"))
            }
            SE::Conflict { entity, key } => {
                CoreError::Conflict(format!("{entity} already exists: {key}"))
            }
            SE::PoolExhausted(msg) => CoreError::Transient(msg),
            SE::Database(e) => classify_database_error(e),
            SE::Migration { version, message } => {
                CoreError::Corrupt(format!("migration {version} failed: {message}"))
            }
        }
    }
}

/// Inspects the underlying SQLite result code behind a raw `sqlx::Error`
/// instead of collapsing every database error into `Corrupt`. `SQLITE_BUSY`
/// (5) and `SQLITE_LOCKED` (6) — a lock-contention timeout under concurrent
/// writers, the case `busy_timeout` (spec §4.2) exists to bound — classify as
/// `Transient` (retryable per spec §7); unique/primary-key constraint
/// violations (19, 1555, 2067) classify as `Conflict`. Anything else
/// (corrupted pages, disk I/O errors, schema mismatches) falls through to
/// `Corrupt`.
fn classify_database_error(e: sqlx::Error) -> CoreError {
    use sqlx::error::DatabaseError;

    if let sqlx::Error::Database(ref db_err) = e {
        if let Some(code) = db_err.code() {
            match code.as_ref() {
                "5" | "6" => return CoreError::Transient(db_err.message().to_string()),
                "19" | "1555" | "2067" => {
                    return CoreError::Conflict(db_err.message().to_string())
                }
                _ => {}
            }
        }
    }
    CoreError::Corrupt(e.to_string())
}

impl From<crate::ingest::IngestError> for CoreError {
    fn from(value: crate::ingest::IngestError) -> Self {
        use crate::ingest::IngestError as IE;
        match value {
            IE::Transient(msg) => CoreError::Transient(msg),
            IE::RateLimited(msg) => CoreError::RateLimited(msg),
            IE::InvalidSource(msg) => CoreError::InvalidInput(msg),
            IE::Store(e) => e.into(),
        }
    }
}
