//! `createTask` / `getTask` / `listTasks` / `updateTask` / `deleteTask` and
//! the lifecycle operations (§6, §4.5).

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::state::{AppState, AuthenticatedAgent};
use crate::auth::Scope;
use crate::domain::{AuditRecord, BackoffStrategy, ScheduleKind, Task, TaskStatus};
use crate::error::OrdinautError;
use crate::schedule;
use crate::store::{audit, tasks};

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub schedule_kind: ScheduleKind,
    pub schedule_expr: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub pipeline: serde_json::Value,
    #[serde(default = "default_priority")]
    pub priority: i16,
    pub dedupe_key: Option<String>,
    pub dedupe_window_seconds: Option<i32>,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    pub concurrency_key: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_priority() -> i16 {
    5
}
fn default_max_retries() -> i32 {
    3
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>, OrdinautError> {
    agent.require_scope(Scope::TaskCreate)?;

    let zone: chrono_tz::Tz = req
        .timezone
        .parse()
        .map_err(|_| OrdinautError::UnknownTimezone(req.timezone.clone()))?;
    if let Some(expr) = &req.schedule_expr {
        if req.schedule_kind != ScheduleKind::Event {
            schedule::validate_expr(req.schedule_kind, expr, zone)?;
        }
    }

    let mut builder = Task::builder()
        .title(req.title)
        .created_by(agent.agent_id)
        .schedule_kind(req.schedule_kind)
        .timezone(req.timezone)
        .pipeline(req.pipeline)
        .priority(req.priority)
        .max_retries(req.max_retries)
        .backoff_strategy(req.backoff_strategy);
    if let Some(expr) = req.schedule_expr {
        builder = builder.schedule_expr(expr);
    }
    if let Some(desc) = req.description {
        builder = builder.description(desc);
    }
    if let Some(key) = req.dedupe_key {
        builder = builder.dedupe_key(key);
    }
    if let Some(window) = req.dedupe_window_seconds {
        builder = builder.dedupe_window_seconds(window);
    }
    if let Some(key) = req.concurrency_key {
        builder = builder.concurrency_key(key);
    }

    let task = tasks::insert(&state.db_pool, &builder.build()).await?;
    state.scheduler.arm(task.id).await;

    audit::record(
        &state.db_pool,
        &AuditRecord::builder()
            .actor_agent_id(agent.agent_id)
            .action("task.create")
            .subject_id(task.id)
            .details(serde_json::json!({ "title": task.title }))
            .build(),
    )
    .await?;

    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, OrdinautError> {
    agent.require_scope(Scope::TaskRead)?;
    let task = tasks::require_by_id(&state.db_pool, id).await?;
    Ok(Json(task))
}

#[derive(Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, OrdinautError> {
    agent.require_scope(Scope::TaskRead)?;
    let tasks = tasks::list(&state.db_pool, query.status, query.limit, query.offset).await?;
    Ok(Json(tasks))
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub schedule_kind: ScheduleKind,
    pub schedule_expr: Option<String>,
    pub timezone: String,
    pub pipeline: serde_json::Value,
    pub priority: i16,
    pub dedupe_key: Option<String>,
    pub dedupe_window_seconds: Option<i32>,
    pub max_retries: i32,
    pub backoff_strategy: BackoffStrategy,
    pub concurrency_key: Option<String>,
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, OrdinautError> {
    agent.require_scope(Scope::TaskWrite)?;

    let zone: chrono_tz::Tz = req
        .timezone
        .parse()
        .map_err(|_| OrdinautError::UnknownTimezone(req.timezone.clone()))?;
    if let Some(expr) = &req.schedule_expr {
        if req.schedule_kind != ScheduleKind::Event {
            schedule::validate_expr(req.schedule_kind, expr, zone)?;
        }
    }

    let mut task = tasks::require_by_id(&state.db_pool, id).await?;
    task.title = req.title;
    task.description = req.description;
    task.schedule_kind = req.schedule_kind;
    task.schedule_expr = req.schedule_expr;
    task.timezone = req.timezone;
    task.pipeline = req.pipeline;
    task.priority = req.priority;
    task.dedupe_key = req.dedupe_key;
    task.dedupe_window_seconds = req.dedupe_window_seconds;
    task.max_retries = req.max_retries;
    task.backoff_strategy = req.backoff_strategy;
    task.concurrency_key = req.concurrency_key;

    let updated = tasks::update(&state.db_pool, &task).await?;
    tasks::delete_unleased_firings(&state.db_pool, id).await?;
    state.scheduler.arm(id).await;

    Ok(Json(updated))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
) -> Result<(), OrdinautError> {
    agent.require_scope(Scope::TaskWrite)?;
    state.scheduler.disarm(id).await;
    tasks::delete(&state.db_pool, id).await
}

pub async fn pause_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, OrdinautError> {
    agent.require_scope(Scope::TaskWrite)?;
    let task = tasks::pause(&state.db_pool, id).await?;
    state.scheduler.disarm(id).await;
    Ok(Json(task))
}

pub async fn resume_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, OrdinautError> {
    agent.require_scope(Scope::TaskWrite)?;
    let task = tasks::resume(&state.db_pool, id).await?;
    state.scheduler.arm(id).await;
    Ok(Json(task))
}

pub async fn cancel_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, OrdinautError> {
    agent.require_scope(Scope::TaskWrite)?;
    let task = tasks::cancel(&state.db_pool, id).await?;
    state.scheduler.disarm(id).await;
    Ok(Json(task))
}

pub async fn run_now(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
) -> Result<(), OrdinautError> {
    agent.require_scope(Scope::TaskWrite)?;
    tasks::require_by_id(&state.db_pool, id).await?;
    state.scheduler.run_now(id).await;
    Ok(())
}

#[derive(Deserialize)]
pub struct SnoozeRequest {
    pub seconds: i64,
}

pub async fn snooze_task(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Path(id): Path<Uuid>,
    Json(req): Json<SnoozeRequest>,
) -> Result<(), OrdinautError> {
    agent.require_scope(Scope::TaskWrite)?;
    tasks::snooze_unleased_firings(&state.db_pool, id, req.seconds).await?;
    Ok(())
}
