//! `publishEvent` (§6): enqueues firings for every active task with
//! `kind=event` and `schedule_expr=topic`. There is no general
//! event-sourcing substrate here — matching in the task table is the
//! entire mechanism (see DESIGN.md for why a broader pub/sub layer was
//! not carried over).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ScheduleKind, TaskStatus};
use crate::error::OrdinautError;
use crate::store::due_work;

#[derive(serde::Serialize)]
pub struct PublishedEvent {
    pub topic: String,
    pub matched_tasks: usize,
}

pub async fn publish(
    pool: &PgPool,
    topic: &str,
    _payload: serde_json::Value,
    _source_agent_id: Uuid,
) -> Result<PublishedEvent, OrdinautError> {
    let matching: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id
        FROM task
        WHERE status = $1 AND schedule_kind = $2 AND schedule_expr = $3
        "#,
    )
    .bind(TaskStatus::Active)
    .bind(ScheduleKind::Event)
    .bind(topic)
    .fetch_all(pool)
    .await?;

    let now = Utc::now();
    for (task_id,) in &matching {
        due_work::enqueue(pool, *task_id, now, None, None).await?;
    }

    Ok(PublishedEvent { topic: topic.to_string(), matched_tasks: matching.len() })
}
