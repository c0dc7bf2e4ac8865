//! Prometheus text-exposition endpoint.

use axum::extract::State;
use axum::http::{header, StatusCode};

use crate::api::state::AppState;

pub async fn metrics_handler(State(state): State<AppState>) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], state.metrics.render())
}
