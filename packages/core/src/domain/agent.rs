//! Agent: the actor that creates tasks and is named on audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// The name of the bootstrap agent that cannot be deleted.
pub const SYSTEM_AGENT_NAME: &str = "system";

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Agent {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub name: String,

    /// Scope strings this agent is authorized for, e.g. `task.create`, `admin`.
    #[builder(default)]
    pub scopes: Vec<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Construct the bootstrap `system` agent, which holds every scope.
    pub fn system() -> Self {
        Self::builder()
            .name(SYSTEM_AGENT_NAME.to_string())
            .scopes(vec!["admin".to_string()])
            .build()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == "admin" || s == scope)
    }

    pub fn is_system(&self) -> bool {
        self.name == SYSTEM_AGENT_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_agent_has_every_scope() {
        let agent = Agent::system();
        assert!(agent.has_scope("task.create"));
        assert!(agent.has_scope("run.read"));
        assert!(agent.is_system());
    }

    #[test]
    fn regular_agent_only_has_its_own_scopes() {
        let agent = Agent::builder()
            .name("crawler-bot")
            .scopes(vec!["task.create".to_string()])
            .build();
        assert!(agent.has_scope("task.create"));
        assert!(!agent.has_scope("event.publish"));
        assert!(!agent.is_system());
    }
}
