//! Five-field POSIX cron (minute hour dayOfMonth month dayOfWeek), evaluated
//! in a target IANA zone rather than UTC.
//!
//! No crate in the corpus offers a pure `nextAfter`-shaped cron evaluator
//! with POSIX's "DOM or DOW" convention, so this is hand-rolled against
//! §4.1, in the small-deterministic-predicate style of
//! `kernel/jobs/job.rs::is_ready`.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::OrdinautError;

/// Number of days scanned before giving up and reporting `no-future`.
/// Large enough to cover "29th of February" and "31st" style filters that
/// only match a handful of times a year.
const MAX_HORIZON_DAYS: i64 = 366 * 5;

#[derive(Debug, Clone)]
pub struct CronSchedule {
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    doms: BTreeSet<u32>,
    months: BTreeSet<u32>,
    dows: BTreeSet<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, OrdinautError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(OrdinautError::InvalidSchedule(format!(
                "cron expression must have 5 fields, got {}: {:?}",
                fields.len(),
                expr
            )));
        }

        let minutes = parse_field(fields[0], 0, 59)?;
        let hours = parse_field(fields[1], 0, 23)?;
        let doms = parse_field(fields[2], 1, 31)?;
        let months = parse_field(fields[3], 1, 12)?;
        let dows = parse_field(fields[4], 0, 6)?;

        Ok(Self {
            dom_restricted: fields[2].trim() != "*",
            dow_restricted: fields[4].trim() != "*",
            minutes,
            hours,
            doms,
            months,
            dows,
        })
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        if !self.months.contains(&date.month()) {
            return false;
        }

        let dom_match = self.doms.contains(&date.day());
        // chrono's Weekday::num_days_from_sunday matches cron's 0=Sunday.
        let dow_match = self.dows.contains(&date.weekday().num_days_from_sunday());

        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom_match || dow_match,
            (true, false) => dom_match,
            (false, true) => dow_match,
            (false, false) => true,
        }
    }

    /// Sorted (hour, minute) pairs this schedule fires at within a day.
    fn times_of_day(&self) -> Vec<(u32, u32)> {
        let mut times = Vec::with_capacity(self.hours.len() * self.minutes.len());
        for &h in &self.hours {
            for &m in &self.minutes {
                times.push((h, m));
            }
        }
        times.sort_unstable();
        times
    }

    /// Returns the next fire instant strictly after `ref_instant`, localized
    /// to `zone`. DST discipline: a non-existent wall-clock candidate
    /// (spring-forward gap) is skipped entirely for that day, matching the
    /// concrete behavior required by the Europe/Chisinau spring-forward
    /// scenario; an ambiguous wall-clock candidate (fall-back) resolves to
    /// the pre-transition (standard-time) occurrence, so it fires once.
    pub fn next_after(
        &self,
        zone: Tz,
        ref_instant: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, OrdinautError> {
        let local_ref = ref_instant.with_timezone(&zone);
        let times = self.times_of_day();
        if times.is_empty() {
            return Ok(None);
        }

        let mut date = local_ref.date_naive();
        let mut after_time = Some(local_ref.time());

        for _ in 0..=MAX_HORIZON_DAYS {
            if self.day_matches(date) {
                for &(h, m) in &times {
                    if let Some(threshold) = after_time {
                        let candidate_time = NaiveTime::from_hms_opt(h, m, 0).unwrap();
                        if candidate_time <= threshold {
                            continue;
                        }
                    }

                    let naive = date.and_hms_opt(h, m, 0).unwrap();
                    match zone.from_local_datetime(&naive) {
                        LocalResult::Single(dt) => return Ok(Some(dt.with_timezone(&Utc))),
                        LocalResult::Ambiguous(earlier, _later) => {
                            return Ok(Some(earlier.with_timezone(&Utc)))
                        }
                        LocalResult::None => continue,
                    }
                }
            }

            date = date.succ_opt().ok_or_else(|| {
                OrdinautError::InvalidSchedule("cron date range exhausted".to_string())
            })?;
            after_time = None;
        }

        Ok(None)
    }
}

fn parse_field(field: &str, min: u32, max: u32) -> Result<BTreeSet<u32>, OrdinautError> {
    let mut values = BTreeSet::new();

    for part in field.split(',') {
        let (range_part, step) = match part.split_once('/') {
            Some((r, s)) => (
                r,
                s.parse::<u32>()
                    .map_err(|_| invalid(field))
                    .and_then(|s| if s == 0 { Err(invalid(field)) } else { Ok(s) })?,
            ),
            None => (part, 1),
        };

        let (lo, hi) = if range_part == "*" {
            (min, max)
        } else if let Some((a, b)) = range_part.split_once('-') {
            let lo = a.parse::<u32>().map_err(|_| invalid(field))?;
            let hi = b.parse::<u32>().map_err(|_| invalid(field))?;
            (lo, hi)
        } else {
            let v = range_part.parse::<u32>().map_err(|_| invalid(field))?;
            (v, v)
        };

        if lo < min || hi > max || lo > hi {
            return Err(invalid(field));
        }

        let mut v = lo;
        while v <= hi {
            values.insert(v);
            v += step;
        }
    }

    if values.is_empty() {
        return Err(invalid(field));
    }

    Ok(values)
}

fn invalid(field: &str) -> OrdinautError {
    OrdinautError::InvalidSchedule(format!("invalid cron field: {:?}", field))
}
