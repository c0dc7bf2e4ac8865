//! `publishEvent` (§6).

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::state::{AppState, AuthenticatedAgent};
use crate::auth::Scope;
use crate::error::OrdinautError;
use crate::events;

#[derive(Deserialize)]
pub struct PublishEventRequest {
    pub topic: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub async fn publish_event(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    Json(req): Json<PublishEventRequest>,
) -> Result<Json<events::PublishedEvent>, OrdinautError> {
    agent.require_scope(Scope::EventPublish)?;
    let published = events::publish(&state.db_pool, &req.topic, req.payload, agent.agent_id).await?;
    Ok(Json(published))
}
