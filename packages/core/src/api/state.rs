//! Shared application state, grounded on
//! `common/app_state.rs::AppState`, generalized from a single
//! visitor/admin pair to an authenticated `agent_id` + scope set.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{JwtService, Scope};
use crate::error::OrdinautError;
use crate::metrics::Metrics;
use crate::scheduler::SchedulerHandle;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt: Arc<JwtService>,
    pub scheduler: SchedulerHandle,
    pub metrics: Arc<Metrics>,
}

/// The authenticated caller, inserted into request extensions by
/// [`crate::api::auth_middleware::auth_middleware`].
#[derive(Clone, Debug)]
pub struct AuthenticatedAgent {
    pub agent_id: Uuid,
    pub scopes: Vec<String>,
}

impl AuthenticatedAgent {
    pub fn require_scope(&self, scope: Scope) -> Result<(), OrdinautError> {
        let needle = scope.as_str();
        if self.scopes.iter().any(|s| s == Scope::Admin.as_str() || s == needle) {
            Ok(())
        } else {
            Err(OrdinautError::Forbidden(format!("missing scope {needle}")))
        }
    }
}
