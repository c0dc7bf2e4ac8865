//! `task_run`: append-only execution attempts (§3, §4.4).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Run;
use crate::error::OrdinautError;

const RUN_COLUMNS: &str = r#"
    id, task_id, firing_id, locked_by, started_at, finished_at, success,
    attempt, output, error, created_at
"#;

/// Records the start of an execution attempt, with `attempt = previous +
/// 1` computed by the caller (the worker, which already holds the
/// firing's current attempt counter).
pub async fn start(pool: &PgPool, run: &Run) -> Result<Run, OrdinautError> {
    let inserted = sqlx::query_as::<_, Run>(&format!(
        r#"
        INSERT INTO task_run (id, task_id, firing_id, locked_by, started_at, attempt, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {RUN_COLUMNS}
        "#
    ))
    .bind(run.id)
    .bind(run.task_id)
    .bind(run.firing_id)
    .bind(&run.locked_by)
    .bind(run.started_at)
    .bind(run.attempt)
    .bind(run.created_at)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

/// Records the terminal outcome of a run: success with output, or failure
/// with an error message. Invariant 3 (§8) — at most one successful
/// run per firing — is upheld by the caller deleting the firing on
/// success before any other worker can claim it again.
pub async fn finish(
    pool: &PgPool,
    run_id: Uuid,
    success: bool,
    output: Option<serde_json::Value>,
    error: Option<String>,
) -> Result<Run, OrdinautError> {
    let updated = sqlx::query_as::<_, Run>(&format!(
        r#"
        UPDATE task_run
        SET finished_at = $1, success = $2, output = $3, error = $4
        WHERE id = $5
        RETURNING {RUN_COLUMNS}
        "#
    ))
    .bind(Utc::now())
    .bind(success)
    .bind(output)
    .bind(error)
    .bind(run_id)
    .fetch_one(pool)
    .await?;

    Ok(updated)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Run>, OrdinautError> {
    let run = sqlx::query_as::<_, Run>(&format!("SELECT {RUN_COLUMNS} FROM task_run WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(run)
}

pub async fn list_for_task(
    pool: &PgPool,
    task_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Run>, OrdinautError> {
    let runs = sqlx::query_as::<_, Run>(&format!(
        "SELECT {RUN_COLUMNS} FROM task_run WHERE task_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(task_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(runs)
}

/// Count of unfinished runs sharing a concurrency key, used for the
/// concurrency-key admission check in the worker pool (§4.5).
pub async fn count_unfinished_for_concurrency_key(
    pool: &PgPool,
    concurrency_key: &str,
    excluding_run_id: Uuid,
) -> Result<i64, OrdinautError> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM task_run r
        JOIN task t ON t.id = r.task_id
        WHERE t.concurrency_key = $1
          AND r.finished_at IS NULL
          AND r.id != $2
        "#,
    )
    .bind(concurrency_key)
    .bind(excluding_run_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// `taskStats(id, period)`: simple success/failure counts for the task
/// over the trailing window. Period is expressed as a Postgres interval
/// literal (e.g. `"24 hours"`).
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct TaskStats {
    pub total_runs: i64,
    pub succeeded: i64,
    pub failed: i64,
}

pub async fn task_stats(pool: &PgPool, task_id: Uuid, period: &str) -> Result<TaskStats, OrdinautError> {
    let row: (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE success = true) AS succeeded,
            COUNT(*) FILTER (WHERE success = false) AS failed
        FROM task_run
        WHERE task_id = $1 AND created_at >= NOW() - $2::interval
        "#,
    )
    .bind(task_id)
    .bind(period)
    .fetch_one(pool)
    .await?;

    Ok(TaskStats { total_runs: row.0, succeeded: row.1, failed: row.2 })
}
