//! Scheduler lag (§4.3): `now - min(run_at)` over eligible, unclaimed
//! firings. The authoritative scheduler health signal, exported as a
//! gauge (§6).

use chrono::Duration;
use sqlx::PgPool;

pub async fn measure_lag(pool: &PgPool) -> Result<Option<Duration>, sqlx::Error> {
    let oldest: Option<(chrono::DateTime<chrono::Utc>,)> = sqlx::query_as(
        r#"
        SELECT run_at
        FROM due_work
        WHERE run_at <= NOW() AND (locked_until IS NULL OR locked_until < NOW())
        ORDER BY run_at
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(oldest.map(|(run_at,)| chrono::Utc::now() - run_at))
}
