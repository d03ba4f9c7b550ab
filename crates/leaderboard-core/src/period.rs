//! Month selection window

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Timestamp format the record store uses in filters ("2025-03-01 00:00:00").
/// The record store compares these against UTC timestamps.
pub const RECORD_STORE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date range for one selected month.
///
/// Starts at midnight on the 1st. For the current month it ends at `now`;
/// for any other month it ends at the last second of the month's last day.
/// Both bounds are wall-clock times in the caller's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MonthWindow {
    pub fn for_month(year: i32, month: u32, now: NaiveDateTime) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("Invalid month: {}-{:02}", year, month))?;

        let end = if first.year() == now.year() && first.month() == now.month() {
            now
        } else {
            last_day_of_month(first).and_time(end_of_day())
        };

        Ok(Self {
            start: first.and_time(NaiveTime::MIN),
            end,
        })
    }

    /// Window for the month containing `now`
    pub fn current(now: NaiveDateTime) -> Self {
        let first = now.date().with_day(1).unwrap_or(now.date());
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: now,
        }
    }

    /// Parse a `YYYY-MM` month argument
    pub fn parse(month: &str, now: NaiveDateTime) -> Result<Self> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
            .with_context(|| format!("Invalid month '{}', expected YYYY-MM", month))?;
        Self::for_month(first.year(), first.month(), now)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn is_current_month(&self, now: NaiveDateTime) -> bool {
        self.start.year() == now.year() && self.start.month() == now.month()
    }

    /// Short label, e.g. "Mar 2025"
    pub fn label(&self) -> String {
        self.start.format("%b %Y").to_string()
    }

    /// Month key, e.g. "2025-03"
    pub fn key(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    /// Inclusive (start, end) bounds for record-store filters, converted from
    /// wall-clock time in `tz` to UTC
    pub fn record_store_bounds<Tz: TimeZone>(&self, tz: &Tz) -> (String, String) {
        (
            to_utc(self.start, tz).format(RECORD_STORE_FORMAT).to_string(),
            to_utc(self.end, tz).format(RECORD_STORE_FORMAT).to_string(),
        )
    }
}

/// Wall-clock time in `tz` as naive UTC. A time skipped by a DST jump has no
/// mapping and is passed through unchanged.
fn to_utc<Tz: TimeZone>(local: NaiveDateTime, tz: &Tz) -> NaiveDateTime {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.naive_utc())
        .unwrap_or(local)
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}
