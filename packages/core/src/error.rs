//! Contract-layer error taxonomy (§7).
//!
//! Operations that can be called by an external caller return
//! `Result<_, OrdinautError>`. Internal glue code (scheduler loop, worker
//! background tasks) uses `anyhow::Result` and converts into this type only
//! at the boundary that must report it to a caller or the audit log —
//! transient store failures are never converted here; they're logged and
//! retried by the caller's own backoff loop.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrdinautError {
    #[error("invalid schedule expression: {0}")]
    InvalidSchedule(String),

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    #[error("agent not found: {0}")]
    AgentNotFound(uuid::Uuid),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for OrdinautError {
    fn into_response(self) -> Response {
        let status = match &self {
            OrdinautError::InvalidSchedule(_) | OrdinautError::UnknownTimezone(_) => {
                StatusCode::BAD_REQUEST
            }
            OrdinautError::TaskNotFound(_) | OrdinautError::AgentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            OrdinautError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrdinautError::Store(_) | OrdinautError::Serde(_) | OrdinautError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
