//! Run: the append-only record of one execution attempt of a firing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Run {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub task_id: Uuid,
    pub firing_id: Uuid,
    pub locked_by: String,

    #[builder(default = Utc::now())]
    pub started_at: DateTime<Utc>,
    #[builder(default, setter(strip_option))]
    pub finished_at: Option<DateTime<Utc>>,

    /// `None` while running; `Some(true/false)` once `finished_at` is set.
    #[builder(default, setter(strip_option))]
    pub success: Option<bool>,

    pub attempt: i32,

    #[builder(default, setter(strip_option))]
    pub output: Option<serde_json::Value>,
    #[builder(default, setter(strip_option))]
    pub error: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

impl Run {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}
