// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::DashboardError;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Postings older than this are out of range for every deployment we care
/// about, so "All Time" is a fixed-epoch span rather than a table scan for
/// the first posting.
pub const ALL_TIME_EPOCH: (i32, u32, u32) = (2000, 1, 1);

/// Concrete inclusive date bounds for one reporting period, plus the
/// immediately preceding span of identical length for period-over-period
/// comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPeriod {
    pub label: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub previous_from_date: NaiveDate,
    pub previous_to_date: NaiveDate,
}

impl ResolvedPeriod {
    pub fn duration_days(&self) -> i64 {
        (self.to_date - self.from_date).num_days() + 1
    }
}

/// Maps a symbolic period name plus optional explicit bounds into concrete
/// dates. Pure function of `today`; callers inject the current date so
/// resolution is deterministic under test.
///
/// Explicit bounds win over everything; a fiscal-year reference (already
/// looked up by the caller) wins over the symbolic name; unrecognized or
/// missing names fall back to "This Month".
pub fn resolve(
    name: Option<&str>,
    explicit_from: Option<NaiveDate>,
    explicit_to: Option<NaiveDate>,
    fiscal: Option<(NaiveDate, NaiveDate)>,
    today: NaiveDate,
) -> Result<ResolvedPeriod, DashboardError> {
    let name = name.map(str::trim).filter(|s| !s.is_empty());

    let (from, to, label) = if let (Some(from), Some(to)) = (explicit_from, explicit_to) {
        (from, to, range_label(from, to))
    } else if let Some((start, end)) = fiscal {
        (start, end, format!("FY {}", start.year()))
    } else {
        match name {
            Some("Today") => (today, today, today.to_string()),
            Some("This Week") => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                let end = start + Duration::days(6);
                (start, end, range_label(start, end))
            }
            Some("Last Month") => {
                let this_start = month_start(today);
                let end = this_start - Duration::days(1);
                let start = month_start(end);
                (start, end, month_label(start))
            }
            Some("This Year") => {
                let (start, end) = year_bounds(today.year());
                (start, end, today.year().to_string())
            }
            Some("Last Year") => {
                let (start, end) = year_bounds(today.year() - 1);
                (start, end, (today.year() - 1).to_string())
            }
            Some("All Time") => {
                let (y, m, d) = ALL_TIME_EPOCH;
                let start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(today);
                (start, today, "All Time".to_string())
            }
            Some("Custom") => {
                return Err(DashboardError::InvalidRange(
                    "custom period requires both from and to dates".to_string(),
                ));
            }
            // "This Month" and every unrecognized or missing name.
            _ => {
                let start = month_start(today);
                let end = month_end(today);
                (start, end, month_label(start))
            }
        }
    };

    if from > to {
        return Err(DashboardError::InvalidRange(format!(
            "from date {} is after to date {}",
            from, to
        )));
    }

    let duration = (to - from).num_days() + 1;
    let previous_to = from - Duration::days(1);
    let previous_from = previous_to - Duration::days(duration - 1);

    Ok(ResolvedPeriod {
        label,
        from_date: from,
        to_date: to,
        previous_from_date: previous_from,
        previous_to_date: previous_to,
    })
}

fn month_start(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d)
}

fn month_end(d: NaiveDate) -> NaiveDate {
    let (y, m) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(d)
}

fn year_bounds(year: i32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(start);
    (start, end)
}

fn month_label(start: NaiveDate) -> String {
    start.format("%B %Y").to_string()
}

fn range_label(from: NaiveDate, to: NaiveDate) -> String {
    format!("{} → {}", from, to)
}
