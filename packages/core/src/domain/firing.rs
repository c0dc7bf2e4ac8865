//! Firing (`due_work`): the intent to execute a task once at `run_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// A row in `due_work`. Either unclaimed (`locked_until` is `None`),
/// claimed (`locked_until` in the future), or expired (`locked_until` in
/// the past — reclaimable by any worker).
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Firing {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub task_id: Uuid,
    pub run_at: DateTime<Utc>,

    #[builder(default, setter(strip_option))]
    pub locked_until: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub locked_by: Option<String>,

    /// 1-based; bumped on each reschedule-for-retry.
    #[builder(default = 1)]
    pub attempt: i32,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

impl Firing {
    pub fn is_claimed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until <= now)
    }

    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.run_at <= now && !self.is_claimed(now)
    }
}
