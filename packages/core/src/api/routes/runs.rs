//! `listRuns` / `getRun` / `taskStats` (§6).

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::state::{AppState, AuthenticatedAgent};
use crate::auth::Scope;
use crate::domain::Run;
use crate::error::OrdinautError;
use crate::store::runs;

#[derive(Deserialize)]
pub struct ListRunsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_runs_for_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(task_id): Path<Uuid>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<Vec<Run>>, OrdinautError> {
    agent.require_scope(Scope::RunRead)?;
    let runs = runs::list_for_task(&state.db_pool, task_id, query.limit, query.offset).await?;
    Ok(Json(runs))
}

pub async fn get_run(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, OrdinautError> {
    agent.require_scope(Scope::RunRead)?;
    let run = runs::find_by_id(&state.db_pool, id)
        .await?
        .ok_or(OrdinautError::TaskNotFound(id))?;
    Ok(Json(run))
}

#[derive(Deserialize)]
pub struct TaskStatsQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "24 hours".to_string()
}

pub async fn task_stats(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(task_id): Path<Uuid>,
    Query(query): Query<TaskStatsQuery>,
) -> Result<Json<runs::TaskStats>, OrdinautError> {
    agent.require_scope(Scope::RunRead)?;
    let stats = runs::task_stats(&state.db_pool, task_id, &query.period).await?;
    Ok(Json(stats))
}
