//! Task CRUD and lifecycle transitions (§4.5), grounded on the
//! `find_by_reference` / `upsert` / plain `sqlx::query_as` style of
//! `kernel/jobs/job.rs`.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Task, TaskStatus};
use crate::error::OrdinautError;

const TASK_COLUMNS: &str = r#"
    id, title, description, created_by, schedule_kind, schedule_expr, timezone,
    pipeline, status, priority, dedupe_key, dedupe_window_seconds, max_retries,
    backoff_strategy, concurrency_key, created_at, updated_at
"#;

pub async fn insert(pool: &PgPool, task: &Task) -> Result<Task, OrdinautError> {
    task.validate()?;

    let inserted = sqlx::query_as::<_, Task>(&format!(
        r#"
        INSERT INTO task (id, title, description, created_by, schedule_kind, schedule_expr,
            timezone, pipeline, status, priority, dedupe_key, dedupe_window_seconds,
            max_retries, backoff_strategy, concurrency_key, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.created_by)
    .bind(task.schedule_kind)
    .bind(&task.schedule_expr)
    .bind(&task.timezone)
    .bind(&task.pipeline)
    .bind(task.status)
    .bind(task.priority)
    .bind(&task.dedupe_key)
    .bind(task.dedupe_window_seconds)
    .bind(task.max_retries)
    .bind(task.backoff_strategy)
    .bind(&task.concurrency_key)
    .bind(task.created_at)
    .bind(task.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Task>, OrdinautError> {
    let task = sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM task WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(task)
}

pub async fn require_by_id(pool: &PgPool, id: Uuid) -> Result<Task, OrdinautError> {
    find_by_id(pool, id).await?.ok_or(OrdinautError::TaskNotFound(id))
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<Task>, OrdinautError> {
    let tasks = sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM task WHERE status = 'active'"
    ))
    .fetch_all(pool)
    .await?;
    Ok(tasks)
}

pub async fn list(
    pool: &PgPool,
    status: Option<TaskStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Task>, OrdinautError> {
    let tasks = match status {
        Some(status) => {
            sqlx::query_as::<_, Task>(&format!(
                "SELECT {TASK_COLUMNS} FROM task WHERE status = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
            ))
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Task>(&format!(
                "SELECT {TASK_COLUMNS} FROM task ORDER BY created_at DESC LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(tasks)
}

/// Update mutable task fields. Used by `updateTask`; the scheduler is
/// responsible for re-arming the timer in response.
pub async fn update(pool: &PgPool, task: &Task) -> Result<Task, OrdinautError> {
    task.validate()?;

    let updated = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE task
        SET title = $1, description = $2, schedule_kind = $3, schedule_expr = $4,
            timezone = $5, pipeline = $6, priority = $7, dedupe_key = $8,
            dedupe_window_seconds = $9, max_retries = $10, backoff_strategy = $11,
            concurrency_key = $12, updated_at = $13
        WHERE id = $14
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.schedule_kind)
    .bind(&task.schedule_expr)
    .bind(&task.timezone)
    .bind(&task.pipeline)
    .bind(task.priority)
    .bind(&task.dedupe_key)
    .bind(task.dedupe_window_seconds)
    .bind(task.max_retries)
    .bind(task.backoff_strategy)
    .bind(&task.concurrency_key)
    .bind(Utc::now())
    .bind(task.id)
    .fetch_optional(pool)
    .await?
    .ok_or(OrdinautError::TaskNotFound(task.id))?;

    Ok(updated)
}

async fn set_status(pool: &PgPool, id: Uuid, status: TaskStatus) -> Result<Task, OrdinautError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE task SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {TASK_COLUMNS}"
    ))
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(OrdinautError::TaskNotFound(id))?;

    Ok(task)
}

pub async fn pause(pool: &PgPool, id: Uuid) -> Result<Task, OrdinautError> {
    set_status(pool, id, TaskStatus::Paused).await
}

pub async fn resume(pool: &PgPool, id: Uuid) -> Result<Task, OrdinautError> {
    set_status(pool, id, TaskStatus::Active).await
}

pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<Task, OrdinautError> {
    let task = set_status(pool, id, TaskStatus::Canceled).await?;
    delete_unleased_firings(pool, id).await?;
    Ok(task)
}

/// `delete`: cascades to `due_work` rows for the task (no precondition —
/// §4.5 lists none).
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), OrdinautError> {
    sqlx::query("DELETE FROM due_work WHERE task_id = $1").bind(id).execute(pool).await?;
    let result = sqlx::query("DELETE FROM task WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(OrdinautError::TaskNotFound(id));
    }
    Ok(())
}

/// Deletes unleased pending firings for a task — used by `cancel` and by
/// the scheduler on `update`/`pause` cleanup.
pub async fn delete_unleased_firings(pool: &PgPool, task_id: Uuid) -> Result<u64, OrdinautError> {
    let result = sqlx::query(
        "DELETE FROM due_work WHERE task_id = $1 AND (locked_until IS NULL OR locked_until < NOW())",
    )
    .bind(task_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// `snooze(delta)`: shifts unleased pending firings' `run_at` forward by
/// `delta_seconds`. Leased firings are untouched.
pub async fn snooze_unleased_firings(
    pool: &PgPool,
    task_id: Uuid,
    delta_seconds: i64,
) -> Result<u64, OrdinautError> {
    let result = sqlx::query(
        r#"
        UPDATE due_work
        SET run_at = run_at + ($1 || ' seconds')::INTERVAL
        WHERE task_id = $2 AND (locked_until IS NULL OR locked_until < NOW())
        "#,
    )
    .bind(delta_seconds)
    .bind(task_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
