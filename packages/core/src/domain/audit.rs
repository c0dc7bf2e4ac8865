//! Audit record: append-only log of administrative and lifecycle actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct AuditRecord {
    #[builder(default = 0)]
    pub id: i64,

    #[builder(default, setter(strip_option))]
    pub actor_agent_id: Option<Uuid>,
    pub action: String,
    #[builder(default, setter(strip_option))]
    pub subject_id: Option<Uuid>,
    #[builder(default)]
    pub details: serde_json::Value,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}
