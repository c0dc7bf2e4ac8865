//! ISO-8601 one-shot schedules: fires exactly once, at a fixed instant.

use chrono::{DateTime, Utc};

use crate::error::OrdinautError;

/// Parses `expr` as an RFC-3339 instant. Timezone-less ("floating") local
/// times are not accepted — the instant must be self-describing, since a
/// one-shot firing has no recurrence to localize against.
pub fn parse(expr: &str) -> Result<DateTime<Utc>, OrdinautError> {
    DateTime::parse_from_rfc3339(expr)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            OrdinautError::InvalidSchedule(format!("invalid ISO-8601 instant {:?}: {e}", expr))
        })
}

/// Returns the instant itself if it is strictly after `ref_instant`, else
/// `None` — a one-shot schedule has already fired or is not due yet has no
/// other meaning once its single instant has passed.
pub fn next_after(
    expr: &str,
    ref_instant: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, OrdinautError> {
    let at = parse(expr)?;
    Ok(if at > ref_instant { Some(at) } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_malformed_instant() {
        assert!(parse("not-a-date").is_err());
    }

    #[test]
    fn fires_once_strictly_in_the_future() {
        let ref_instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let next = next_after("2025-06-01T12:00:00Z", ref_instant).unwrap();
        assert_eq!(next, Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()));
    }

    #[test]
    fn does_not_fire_once_instant_has_passed() {
        let ref_instant = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let next = next_after("2025-06-01T12:00:00Z", ref_instant).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn does_not_fire_exactly_at_ref_instant() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let next = next_after("2025-06-01T12:00:00Z", at).unwrap();
        assert_eq!(next, None);
    }
}
