//! RFC-5545 RRULE evaluation, grounded directly on
//! `domains/schedules/models/schedule.rs::next_occurrences` (the
//! `DTSTART:...\nRRULE:...` string assembly and `rrule::RRuleSet` usage),
//! generalized from a fixed 90-day lookup window into a single `nextAfter`
//! call and given explicit pre-flight validation per §4.1.

use std::collections::HashSet;

use chrono::DateTime;
use chrono::Utc;
use chrono_tz::Tz;

use crate::error::OrdinautError;

const ALLOWED_FREQ: &[&str] = &[
    "SECONDLY", "MINUTELY", "HOURLY", "DAILY", "WEEKLY", "MONTHLY", "YEARLY",
];

/// Validates the rrule body against the subset of RFC-5545 §4.1
/// requires, ahead of handing it to the `rrule` crate (which is more
/// permissive than we want to be at task create/update time).
pub fn validate(expr: &str) -> Result<(), OrdinautError> {
    let mut freq: Option<&str> = None;
    let mut interval: Option<i64> = None;
    let mut has_count = false;
    let mut has_until = false;
    let mut byday: Vec<String> = Vec::new();
    let mut bymonth: Vec<i64> = Vec::new();

    for part in expr.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once('=') else {
            return Err(invalid(expr, "malformed clause"));
        };

        match key {
            "FREQ" => {
                if !ALLOWED_FREQ.contains(&value) {
                    return Err(invalid(expr, &format!("unsupported FREQ {value}")));
                }
                freq = Some(value);
            }
            "INTERVAL" => {
                let v: i64 = value.parse().map_err(|_| invalid(expr, "INTERVAL not an integer"))?;
                if v < 1 {
                    return Err(invalid(expr, "INTERVAL must be >= 1"));
                }
                interval = Some(v);
            }
            "COUNT" => has_count = true,
            "UNTIL" => has_until = true,
            "BYDAY" => byday = value.split(',').map(|s| s.to_string()).collect(),
            "BYMONTH" => {
                for v in value.split(',') {
                    bymonth.push(v.parse().map_err(|_| invalid(expr, "BYMONTH not an integer"))?);
                }
            }
            _ => {}
        }
    }

    if freq.is_none() {
        return Err(invalid(expr, "missing FREQ"));
    }
    if has_count && has_until {
        return Err(invalid(expr, "COUNT and UNTIL are mutually exclusive"));
    }
    let _ = interval;

    if !byday.is_empty() {
        let (min, max) = match freq {
            Some("MONTHLY") => (1, 5),
            Some("YEARLY") => (1, 53),
            _ => (i64::MIN, i64::MAX),
        };
        for day in &byday {
            // Ordinal prefix, e.g. "-1FR" (last Friday) or "2MO" (second Monday).
            let digits: String = day
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
                .collect();
            if digits.is_empty() {
                continue;
            }
            let ordinal: i64 = digits.parse().map_err(|_| invalid(expr, "bad BYDAY ordinal"))?;
            if ordinal == 0 || ordinal.unsigned_abs() as i64 > max || ordinal.unsigned_abs() as i64 < min {
                return Err(invalid(expr, &format!("BYDAY ordinal {ordinal} out of range")));
            }
        }
    }

    for month in &bymonth {
        if !(1..=12).contains(month) {
            return Err(invalid(expr, &format!("BYMONTH {month} out of range")));
        }
    }

    Ok(())
}

fn invalid(expr: &str, reason: &str) -> OrdinautError {
    OrdinautError::InvalidSchedule(format!("invalid rrule {:?}: {reason}", expr))
}

/// Returns the next occurrence strictly after `ref_instant`, or `None` if
/// the rule has terminated (past `UNTIL` or exhausted `COUNT`).
///
/// The rule is anchored with `DTSTART` set to `ref_instant` itself,
/// localized to `zone`, re-anchoring DTSTART to "now" on every call. This is the
/// only anchor available given `nextAfter`'s stateless signature.
pub fn next_after(
    expr: &str,
    zone: Tz,
    ref_instant: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, OrdinautError> {
    validate(expr)?;

    let local_ref = ref_instant.with_timezone(&zone);
    let full = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        zone.name(),
        local_ref.format("%Y%m%dT%H%M%S"),
        expr
    );

    let rrule_set: ::rrule::RRuleSet = full
        .parse()
        .map_err(|e| invalid(expr, &format!("rrule parse error: {e}")))?;

    let start = local_ref.with_timezone(&::rrule::Tz::from(zone));
    let result = rrule_set.after(start).all(1);

    Ok(result.dates.into_iter().next().map(|d| d.with_timezone(&Utc)))
}

/// Distinct BYDAY tokens seen, for diagnostics/tests.
#[allow(dead_code)]
fn byday_tokens(expr: &str) -> HashSet<String> {
    expr.split(';')
        .find_map(|p| p.strip_prefix("BYDAY="))
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn rejects_missing_freq() {
        assert!(validate("INTERVAL=1").is_err());
    }

    #[test]
    fn rejects_unsupported_freq() {
        assert!(validate("FREQ=FORTNIGHTLY").is_err());
    }

    #[test]
    fn rejects_count_and_until_together() {
        assert!(validate("FREQ=DAILY;COUNT=5;UNTIL=20250101T000000Z").is_err());
    }

    #[test]
    fn rejects_interval_zero() {
        assert!(validate("FREQ=DAILY;INTERVAL=0").is_err());
    }

    #[test]
    fn rejects_out_of_range_byday_ordinal_for_monthly() {
        assert!(validate("FREQ=MONTHLY;BYDAY=6MO").is_err());
        assert!(validate("FREQ=MONTHLY;BYDAY=-1FR").is_ok());
    }

    #[test]
    fn rejects_out_of_range_bymonth() {
        assert!(validate("FREQ=YEARLY;BYMONTH=13").is_err());
    }

    #[test]
    fn business_mornings_produce_weekday_firings() {
        // S2: created Sunday 2025-08-10 12:00 local, Europe/Chisinau.
        let ref_instant = chrono_tz::Europe::Chisinau
            .with_ymd_and_hms(2025, 8, 10, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);

        let next = next_after(
            "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=8;BYMINUTE=30",
            chrono_tz::Europe::Chisinau,
            ref_instant,
        )
        .unwrap()
        .unwrap();

        let local = next.with_timezone(&chrono_tz::Europe::Chisinau);
        assert_eq!(local.day(), 11);
        assert_eq!((local.hour(), local.minute()), (8, 30));
    }

    #[test]
    fn exhausted_count_returns_none() {
        let ref_instant = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let result = next_after("FREQ=DAILY;COUNT=1", chrono_tz::UTC, ref_instant).unwrap();
        // DTSTART == ref_instant consumes the single count occurrence, so
        // nothing remains strictly after it.
        assert!(result.is_none());
    }
}
