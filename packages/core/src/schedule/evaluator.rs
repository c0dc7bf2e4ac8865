//! Unified schedule evaluator contract (§4.1):
//! `nextAfter(kind, expr, zone, refInstant) -> instant | none`, dispatching
//! to the cron, rrule or once evaluator by `ScheduleKind`. Event-kind tasks
//! have no timer representation and are rejected here — they are armed by
//! `publishEvent` matching against the task table directly, not by the
//! scheduler's timer registry.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::domain::ScheduleKind;
use crate::error::OrdinautError;

use super::{cron, once, rrule};

/// Validates that `expr` is well-formed for `kind`, without computing an
/// occurrence. Used at task create/update time so a malformed expression is
/// rejected before it is ever persisted.
pub fn validate_expr(kind: ScheduleKind, expr: &str, zone: Tz) -> Result<(), OrdinautError> {
    match kind {
        ScheduleKind::Cron => cron::CronSchedule::parse(expr).map(|_| ()),
        ScheduleKind::Rrule => rrule::validate(expr),
        ScheduleKind::Once => once::parse(expr).map(|_| ()),
        ScheduleKind::Event => Err(OrdinautError::InvalidSchedule(
            "event-kind tasks carry no schedule expression".to_string(),
        )),
    }
    .map(|result| {
        let _ = zone;
        result
    })
}

/// Computes the next firing instant strictly after `ref_instant`, or `None`
/// if the schedule has no remaining future occurrence (exhausted `COUNT`,
/// past `UNTIL`, or a one-shot instant already elapsed).
pub fn next_after(
    kind: ScheduleKind,
    expr: &str,
    zone: Tz,
    ref_instant: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, OrdinautError> {
    match kind {
        ScheduleKind::Cron => cron::CronSchedule::parse(expr)?.next_after(zone, ref_instant),
        ScheduleKind::Rrule => rrule::next_after(expr, zone, ref_instant),
        ScheduleKind::Once => once::next_after(expr, ref_instant),
        ScheduleKind::Event => Err(OrdinautError::InvalidSchedule(
            "event-kind tasks have no timer occurrence".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_kind_has_no_timer_occurrence() {
        let ref_instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(next_after(ScheduleKind::Event, "", chrono_tz::UTC, ref_instant).is_err());
    }

    #[test]
    fn dispatches_cron_expressions() {
        let ref_instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let next = next_after(ScheduleKind::Cron, "0 9 * * *", chrono_tz::UTC, ref_instant)
            .unwrap()
            .unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn dispatches_once_expressions() {
        let ref_instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let next = next_after(
            ScheduleKind::Once,
            "2025-02-01T00:00:00Z",
            chrono_tz::UTC,
            ref_instant,
        )
        .unwrap();
        assert_eq!(next, Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn validate_rejects_event_kind() {
        assert!(validate_expr(ScheduleKind::Event, "", chrono_tz::UTC).is_err());
    }
}
