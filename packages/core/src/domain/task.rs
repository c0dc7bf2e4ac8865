//! Task: a declarative, schedulable unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Active,
    Paused,
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "schedule_kind", rename_all = "snake_case")]
pub enum ScheduleKind {
    Cron,
    Rrule,
    Once,
    Event,
}

impl ScheduleKind {
    /// Whether the scheduler re-arms a timer after this kind fires.
    pub fn is_recurring(&self) -> bool {
        matches!(self, ScheduleKind::Cron | ScheduleKind::Rrule)
    }

    /// `event` tasks are never registered with the scheduler's timer
    /// registry — they only enqueue on `publishEvent`.
    pub fn uses_timer(&self) -> bool {
        !matches!(self, ScheduleKind::Event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "backoff_strategy", rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Linear,
    #[default]
    ExponentialJitter,
}

/// A declarative, schedulable unit of work.
///
/// `pipeline` is an opaque JSON payload — the core never introspects it
/// (§1, §9: pipeline semantics belong to the external executor).
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Task {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub title: String,
    #[builder(default, setter(strip_option))]
    pub description: Option<String>,

    pub created_by: Uuid,

    pub schedule_kind: ScheduleKind,
    /// Kind-dependent: cron string, rrule body, ISO instant, or event topic.
    /// Empty only when `schedule_kind == Event` and no topic filter is set.
    #[builder(default, setter(strip_option))]
    pub schedule_expr: Option<String>,

    #[builder(default = "UTC".to_string())]
    pub timezone: String,

    pub pipeline: serde_json::Value,

    #[builder(default)]
    pub status: TaskStatus,

    /// 1 (highest) .. 9 (lowest).
    #[builder(default = 5)]
    pub priority: i16,

    #[builder(default, setter(strip_option))]
    pub dedupe_key: Option<String>,
    #[builder(default, setter(strip_option))]
    pub dedupe_window_seconds: Option<i32>,

    #[builder(default = 3)]
    pub max_retries: i32,
    #[builder(default)]
    pub backoff_strategy: BackoffStrategy,

    #[builder(default, setter(strip_option))]
    pub concurrency_key: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Invariants from §3: cron/rrule/once require a non-empty
    /// expression; the timezone must parse as a valid IANA zone.
    pub fn validate(&self) -> Result<(), crate::error::OrdinautError> {
        match self.schedule_kind {
            ScheduleKind::Cron | ScheduleKind::Rrule | ScheduleKind::Once => {
                let expr = self.schedule_expr.as_deref().unwrap_or("");
                if expr.trim().is_empty() {
                    return Err(crate::error::OrdinautError::InvalidSchedule(format!(
                        "{:?} task requires a non-empty schedule_expr",
                        self.schedule_kind
                    )));
                }
            }
            ScheduleKind::Event => {}
        }

        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| crate::error::OrdinautError::UnknownTimezone(self.timezone.clone()))?;

        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }
}
