//! `audit_log`: append-only log of lifecycle and administrative actions.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::AuditRecord;
use crate::error::OrdinautError;

pub async fn record(pool: &PgPool, entry: &AuditRecord) -> Result<AuditRecord, OrdinautError> {
    let inserted = sqlx::query_as::<_, AuditRecord>(
        r#"
        INSERT INTO audit_log (actor_agent_id, action, subject_id, details, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, actor_agent_id, action, subject_id, details, created_at
        "#,
    )
    .bind(entry.actor_agent_id)
    .bind(&entry.action)
    .bind(entry.subject_id)
    .bind(&entry.details)
    .bind(entry.created_at)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

pub async fn list_for_subject(
    pool: &PgPool,
    subject_id: Uuid,
    limit: i64,
) -> Result<Vec<AuditRecord>, OrdinautError> {
    let entries = sqlx::query_as::<_, AuditRecord>(
        r#"
        SELECT id, actor_agent_id, action, subject_id, details, created_at
        FROM audit_log
        WHERE subject_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(subject_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
