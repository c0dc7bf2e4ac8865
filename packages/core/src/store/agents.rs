//! Agent CRUD. Agents are the bearer-token principals that own tasks and
//! are recorded as run `locked_by` / audit `actor_agent_id`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Agent;
use crate::error::OrdinautError;

pub async fn insert(pool: &PgPool, agent: &Agent) -> Result<Agent, OrdinautError> {
    let inserted = sqlx::query_as::<_, Agent>(
        r#"
        INSERT INTO agent (id, name, scopes, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, scopes, created_at
        "#,
    )
    .bind(agent.id)
    .bind(&agent.name)
    .bind(&agent.scopes)
    .bind(agent.created_at)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Agent>, OrdinautError> {
    let agent = sqlx::query_as::<_, Agent>("SELECT id, name, scopes, created_at FROM agent WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(agent)
}

pub async fn require_by_id(pool: &PgPool, id: Uuid) -> Result<Agent, OrdinautError> {
    find_by_id(pool, id).await?.ok_or(OrdinautError::AgentNotFound(id))
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Agent>, OrdinautError> {
    let agent = sqlx::query_as::<_, Agent>("SELECT id, name, scopes, created_at FROM agent WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(agent)
}
