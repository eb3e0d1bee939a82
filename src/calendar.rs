use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// A year/month/day identity in local time, independent of time-of-day.
///
/// Completion is recorded per calendar day, so two instants on the same
/// day map to the same key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// Returns `None` if the date does not exist.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(CalendarDay)
    }

    /// Truncates an instant to its local calendar day.
    pub fn of(instant: NaiveDateTime) -> Self {
        CalendarDay(instant.date())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Local midnight at the start of this day.
    pub fn start(&self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }

    pub fn weekday_index(&self) -> u8 {
        weekday_index(self.0)
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        CalendarDay(date)
    }
}

impl From<NaiveDateTime> for CalendarDay {
    fn from(instant: NaiveDateTime) -> Self {
        CalendarDay::of(instant)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for CalendarDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(CalendarDay)
    }
}

/// Short weekday labels indexed Sunday = 0 .. Saturday = 6.
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Day of week with Sunday = 0 .. Saturday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn is_same_day(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date()
}

/// The Sunday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(weekday_index(date) as i64)
}

/// The given weekday (Sunday = 0) in the week after the one containing `today`.
pub fn next_week_day(today: NaiveDate, weekday: u8) -> NaiveDate {
    start_of_week(today) + Duration::days(7 + (weekday % 7) as i64)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 0,
    }
}

/// Builds a local instant, or `None` when the day does not exist in that month
/// (no clamping: day 31 in April is `None`).
pub fn ymd_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Places `date` at the hour and minute of `time_of`.
pub fn at_time_of(date: NaiveDate, time_of: NaiveDateTime) -> NaiveDateTime {
    date.and_hms_opt(time_of.hour(), time_of.minute(), 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

/// `days` consecutive dates starting at `start`.
pub fn date_range(start: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days).map(|i| start + Duration::days(i as i64)).collect()
}

/// Day numbers a monthly task may pick from.
pub fn month_days() -> RangeInclusive<u8> {
    1..=31
}

/// Drops seconds and rounds the minute to the nearest multiple of five.
/// Rounding up past :55 rolls into the next hour (and day).
pub fn round_to_nearest_five_minutes(instant: NaiveDateTime) -> NaiveDateTime {
    let minute = instant.minute();
    let rounded = (minute + 2) / 5 * 5;
    let hour_start = instant
        .date()
        .and_hms_opt(instant.hour(), 0, 0)
        .unwrap_or(instant);
    hour_start + Duration::minutes(rounded as i64)
}
