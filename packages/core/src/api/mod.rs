//! HTTP surface: a thin translator over the core operations, not part of
//! the core itself (§1). Grounded on `server/app.rs::build_app`'s
//! router assembly — CORS, tracing, and an auth middleware layered before
//! the state extension — stripped of everything domain-specific to this
//! repo's original product.

pub mod auth_middleware;
pub mod routes;
pub mod state;

use axum::http::Method;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/tasks", post(routes::tasks::create_task).get(routes::tasks::list_tasks))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task).put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/pause", post(routes::tasks::pause_task))
        .route("/tasks/:id/resume", post(routes::tasks::resume_task))
        .route("/tasks/:id/cancel", post(routes::tasks::cancel_task))
        .route("/tasks/:id/run-now", post(routes::tasks::run_now))
        .route("/tasks/:id/snooze", post(routes::tasks::snooze_task))
        .route("/tasks/:id/runs", get(routes::runs::list_runs_for_task))
        .route("/tasks/:id/stats", get(routes::runs::task_stats))
        .route("/runs/:id", get(routes::runs::get_run))
        .route("/events", post(routes::events::publish_event))
        .route("/agents", post(routes::agents::create_agent))
        .route("/health", get(routes::health::health_handler))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::auth_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
