//! Agent registration and token issuance. Not named explicitly in the
//! task submission contract (§6 only lists task/run/event
//! operations) but required to bootstrap a bearer token for any of them
//! — admin-scoped only.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::state::{AppState, AuthenticatedAgent};
use crate::auth::Scope;
use crate::domain::Agent;
use crate::error::OrdinautError;
use crate::store::agents;

#[derive(Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub scopes: Vec<String>,
}

#[derive(Serialize)]
pub struct CreateAgentResponse {
    pub agent: Agent,
    pub token: String,
}

pub async fn create_agent(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedAgent>,
    Json(req): Json<CreateAgentRequest>,
) -> Result<Json<CreateAgentResponse>, OrdinautError> {
    caller.require_scope(Scope::Admin)?;

    let agent = Agent::builder().name(req.name).scopes(req.scopes.clone()).build();
    let agent = agents::insert(&state.db_pool, &agent).await?;
    let token = state.jwt.issue(agent.id, req.scopes)?;

    Ok(Json(CreateAgentResponse { agent, token }))
}
