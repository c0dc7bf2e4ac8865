//! `due_work`: the durable lease-based work queue (§4.2).
//!
//! Grounded on `kernel/jobs/job.rs::claim_jobs` (the `FOR UPDATE SKIP
//! LOCKED` claim statement) and `kernel/jobs/queue.rs::mark_failed`'s
//! backoff arithmetic, generalized to the split drawn between the
//! durable queue entry (a firing) and its execution attempts (a run).

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{BackoffStrategy, Firing};
use crate::error::OrdinautError;

/// Outcome of `enqueue`: either a freshly inserted firing or a hit on the
/// dedupe window (§4.2, "Dedupe window").
#[derive(Debug, Clone, Copy)]
pub enum EnqueueResult {
    Created(Uuid),
    Duplicate(Uuid),
}

impl EnqueueResult {
    pub fn firing_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }
}

/// A firing claimed by `lease_next`, paired with its owning task id.
#[derive(Debug, Clone)]
pub struct LeasedFiring {
    pub firing: Firing,
    pub task_id: Uuid,
}

/// `enqueue(taskId, runAt) -> firingId | duplicate`.
///
/// When `dedupe_key` and `dedupe_window_seconds` are both set, `run_at` is
/// bucketed into `floor(epoch(run_at) / window)` and the insert is made
/// conditional on `idx_due_work_dedupe (task_id, dedupe_bucket)` via
/// `ON CONFLICT DO NOTHING` — the database, not a prior `SELECT`, is what
/// rules out a second row for the same task/bucket, so concurrent callers
/// racing the same bucket still yield exactly one `Created`.
pub async fn enqueue(
    pool: &PgPool,
    task_id: Uuid,
    run_at: DateTime<Utc>,
    dedupe_key: Option<&str>,
    dedupe_window_seconds: Option<i32>,
) -> Result<EnqueueResult, OrdinautError> {
    let bucket = match (dedupe_key, dedupe_window_seconds) {
        (Some(_), Some(window)) if window > 0 => Some(run_at.timestamp().div_euclid(window as i64)),
        _ => None,
    };

    // A bucket collision means another caller already won the insert; loop
    // once to cover the narrow case where that row is deleted (claimed and
    // completed) between our failed insert and the follow-up lookup.
    for _ in 0..2 {
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO due_work (id, task_id, run_at, attempt, dedupe_bucket)
            VALUES ($1, $2, $3, 1, $4)
            ON CONFLICT (task_id, dedupe_bucket) WHERE dedupe_bucket IS NOT NULL DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(run_at)
        .bind(bucket)
        .fetch_optional(pool)
        .await?;

        if let Some((id,)) = inserted {
            return Ok(EnqueueResult::Created(id));
        }

        let Some(bucket) = bucket else {
            // No dedupe in play, so this was a genuine write failure rather
            // than a conflict (ON CONFLICT only applies to the partial
            // index); retrying would loop forever, so surface nothing.
            unreachable!("unconditional insert without a dedupe bucket cannot hit ON CONFLICT");
        };

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM due_work WHERE task_id = $1 AND dedupe_bucket = $2")
                .bind(task_id)
                .bind(bucket)
                .fetch_optional(pool)
                .await?;

        if let Some((id,)) = existing {
            return Ok(EnqueueResult::Duplicate(id));
        }
        // The conflicting row vanished between our insert and this lookup;
        // the bucket is free again, so loop back and insert for real.
    }

    Err(OrdinautError::Internal(
        "enqueue dedupe bucket repeatedly contested".to_string(),
    ))
}

/// `leaseNext(workerId, leaseDuration) -> (firingId, taskId) | none`.
///
/// Atomic claim: selects the oldest eligible row (`run_at <= now` and
/// unlocked or lease-expired), skipping rows locked by a concurrent
/// claimant, then stamps the lease in the same statement.
///
/// A row with a non-null `locked_until` was leased before and its lease
/// has since expired without a reschedule or completion — a worker died
/// mid-execution. Reclaiming it therefore bumps `attempt`, the same as an
/// explicit retry, so the run this produces is correctly numbered; a
/// row's first-ever claim (`locked_until IS NULL`) leaves `attempt` at its
/// inserted value of 1.
pub async fn lease_next(
    pool: &PgPool,
    worker_id: &str,
    lease_duration: Duration,
) -> Result<Option<LeasedFiring>, OrdinautError> {
    let firing = sqlx::query_as::<_, Firing>(
        r#"
        WITH next_firing AS (
            SELECT id
            FROM due_work
            WHERE run_at <= NOW()
              AND (locked_until IS NULL OR locked_until < NOW())
            ORDER BY run_at, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        UPDATE due_work
        SET locked_until = NOW() + ($1 || ' seconds')::INTERVAL,
            locked_by = $2,
            attempt = attempt + (CASE WHEN locked_until IS NOT NULL THEN 1 ELSE 0 END)
        WHERE id IN (SELECT id FROM next_firing)
        RETURNING id, task_id, run_at, locked_until, locked_by, attempt, created_at
        "#,
    )
    .bind(lease_duration.num_seconds())
    .bind(worker_id)
    .fetch_optional(pool)
    .await?;

    Ok(firing.map(|firing| LeasedFiring { task_id: firing.task_id, firing }))
}

/// Heartbeat: extends a held lease so a long-running execution doesn't
/// have it reclaimed out from under it.
pub async fn extend_lease(
    pool: &PgPool,
    firing_id: Uuid,
    worker_id: &str,
    lease_duration: Duration,
) -> Result<bool, OrdinautError> {
    let result = sqlx::query(
        r#"
        UPDATE due_work
        SET locked_until = NOW() + ($1 || ' seconds')::INTERVAL
        WHERE id = $2 AND locked_by = $3
        "#,
    )
    .bind(lease_duration.num_seconds())
    .bind(firing_id)
    .bind(worker_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Terminal success: deletes the firing. The run row itself is written by
/// the caller via `store::runs::record_outcome` before this is called.
pub async fn complete_success(pool: &PgPool, firing_id: Uuid) -> Result<(), OrdinautError> {
    sqlx::query("DELETE FROM due_work WHERE id = $1")
        .bind(firing_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Terminal failure (retries exhausted or non-retryable): deletes the
/// firing, same as success — a terminally-failed run is still a
/// successful outcome at the orchestrator level (§7).
pub async fn complete_terminal_failure(pool: &PgPool, firing_id: Uuid) -> Result<(), OrdinautError> {
    sqlx::query("DELETE FROM due_work WHERE id = $1")
        .bind(firing_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Retryable failure: reschedules the firing with `run_at = now +
/// backoff(attempt, strategy)` and clears the lease, per §4.4.
pub async fn reschedule_for_retry(
    pool: &PgPool,
    firing_id: Uuid,
    attempt: i32,
    strategy: BackoffStrategy,
) -> Result<(), OrdinautError> {
    let delay = backoff_delay(attempt, strategy);
    sqlx::query(
        r#"
        UPDATE due_work
        SET run_at = NOW() + ($1 || ' milliseconds')::INTERVAL,
            attempt = $2,
            locked_until = NULL,
            locked_by = NULL
        WHERE id = $3
        "#,
    )
    .bind(delay.num_milliseconds())
    .bind(attempt + 1)
    .bind(firing_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Concurrency-key collision: release the lease without counting it as a
/// retry attempt and nudge `run_at` forward by a short delay (§4.5).
pub async fn defer_for_concurrency_conflict(
    pool: &PgPool,
    firing_id: Uuid,
    delay: Duration,
) -> Result<(), OrdinautError> {
    sqlx::query(
        r#"
        UPDATE due_work
        SET run_at = NOW() + ($1 || ' seconds')::INTERVAL,
            locked_until = NULL,
            locked_by = NULL
        WHERE id = $2
        "#,
    )
    .bind(delay.num_seconds())
    .bind(firing_id)
    .execute(pool)
    .await?;

    Ok(())
}

const DEFAULT_BASE: i64 = 1_000;
const DEFAULT_CAP_MS: i64 = 5 * 60 * 1_000;

/// `fixed`: base. `linear`: base * attempt. `exponential_jitter`: base *
/// 2^(attempt-1) * uniform(0.5, 1.5), capped.
pub fn backoff_delay(attempt: i32, strategy: BackoffStrategy) -> Duration {
    let attempt = attempt.max(1) as i64;
    let ms = match strategy {
        BackoffStrategy::Fixed => DEFAULT_BASE,
        BackoffStrategy::Linear => DEFAULT_BASE * attempt,
        BackoffStrategy::ExponentialJitter => {
            let exp = DEFAULT_BASE.saturating_mul(1i64 << (attempt - 1).min(30));
            let jitter = rand::random::<f64>() * 1.0 + 0.5; // uniform(0.5, 1.5)
            ((exp as f64) * jitter) as i64
        }
    };
    Duration::milliseconds(ms.min(DEFAULT_CAP_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_is_constant() {
        assert_eq!(backoff_delay(1, BackoffStrategy::Fixed).num_milliseconds(), DEFAULT_BASE);
        assert_eq!(backoff_delay(5, BackoffStrategy::Fixed).num_milliseconds(), DEFAULT_BASE);
    }

    #[test]
    fn linear_backoff_scales_with_attempt() {
        assert_eq!(backoff_delay(3, BackoffStrategy::Linear).num_milliseconds(), DEFAULT_BASE * 3);
    }

    #[test]
    fn exponential_jitter_stays_within_jitter_bounds() {
        for attempt in 1..=4 {
            let ms = backoff_delay(attempt, BackoffStrategy::ExponentialJitter).num_milliseconds();
            let base = DEFAULT_BASE * (1i64 << (attempt - 1));
            assert!(ms as f64 >= base as f64 * 0.5 - 1.0);
            assert!(ms as f64 <= base as f64 * 1.5 + 1.0);
        }
    }

    #[test]
    fn exponential_jitter_is_capped() {
        let ms = backoff_delay(20, BackoffStrategy::ExponentialJitter).num_milliseconds();
        assert!(ms <= DEFAULT_CAP_MS);
    }
}
