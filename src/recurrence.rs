//! Resolves a task's recurrence rule into concrete occurrences.
//!
//! All instants are naive local times. Weekly and monthly occurrences take
//! the hour and minute of the task's anchor; yearly occurrences keep the
//! anchor's full month, day and time.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::calendar::{at_time_of, next_week_day, weekday_index, ymd_at, CalendarDay};
use crate::models::{Recurrence, Task};

/// How far ahead a monthly rule is searched before giving up.
pub const MONTHLY_SEARCH_MONTHS: u32 = 12;

/// How far ahead a yearly rule is searched (covers Feb 29 anchors).
const YEARLY_SEARCH_YEARS: i32 = 8;

/// How "is this task due on day D" is answered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DueMode {
    /// Resolve as if the clock stood just before D. Repeating tasks show up
    /// on every matching day.
    #[default]
    Reanchored,
    /// Resolve against the real clock; a task shows up only on its next
    /// upcoming day.
    NextOccurrence,
}

/// Computes the next instant at or after `now` at which `task` is due.
pub fn next_occurrence(task: &Task, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let anchor = task.anchor;
    match &task.recurrence {
        Recurrence::None => Some(anchor),
        Recurrence::NextWeekOnce => {
            if anchor < now {
                None
            } else {
                Some(anchor)
            }
        }
        Recurrence::Weekly { days } => {
            let days: Vec<u8> = days.iter().copied().collect();
            next_weekly(&days, anchor, now)
        }
        Recurrence::Monthly { days } => {
            let days: Vec<u8> = days.iter().copied().collect();
            next_monthly(&days, anchor, now)
        }
        Recurrence::Yearly => next_yearly(anchor, now),
    }
}

fn next_weekly(days: &[u8], anchor: NaiveDateTime, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = now.date();
    for i in 0..7 {
        let date = today + Duration::days(i);
        if days.contains(&weekday_index(date)) {
            let candidate = at_time_of(date, anchor);
            if candidate > now {
                return Some(candidate);
            }
        }
    }

    // Only today's weekday matched and its time has passed: take the first
    // selected weekday of next week.
    let first = *days.iter().min()?;
    Some(at_time_of(next_week_day(today, first), anchor))
}

fn next_monthly(days: &[u8], anchor: NaiveDateTime, now: NaiveDateTime) -> Option<NaiveDateTime> {
    // `days` comes from a BTreeSet and is already ascending.
    let (mut year, mut month) = (now.year(), now.month());
    for _ in 0..=MONTHLY_SEARCH_MONTHS {
        for &day in days {
            let Some(candidate) = ymd_at(year, month, day as u32, anchor.hour(), anchor.minute()) else {
                continue;
            };
            if candidate > now {
                return Some(candidate);
            }
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    None
}

fn next_yearly(anchor: NaiveDateTime, now: NaiveDateTime) -> Option<NaiveDateTime> {
    (now.year()..=now.year() + YEARLY_SEARCH_YEARS)
        .filter_map(|year| anchor.with_year(year))
        .find(|candidate| *candidate >= now)
}

/// True iff the task has an occurrence on `day`, resolving with the clock
/// pinned to the last second before that day starts.
pub fn is_due_on(task: &Task, day: CalendarDay) -> bool {
    occurrence_on(task, day).is_some()
}

/// True iff the task's next occurrence relative to `now` falls on `day`.
pub fn next_occurrence_falls_on(task: &Task, day: CalendarDay, now: NaiveDateTime) -> bool {
    next_occurrence(task, now).is_some_and(|at| CalendarDay::of(at) == day)
}

/// Dispatches on `mode` to one of the two due-day checks.
pub fn is_due(task: &Task, day: CalendarDay, now: NaiveDateTime, mode: DueMode) -> bool {
    match mode {
        DueMode::Reanchored => is_due_on(task, day),
        DueMode::NextOccurrence => next_occurrence_falls_on(task, day, now),
    }
}

/// The instant on `day` at which the task is due, when it is due that day.
pub fn occurrence_on(task: &Task, day: CalendarDay) -> Option<NaiveDateTime> {
    let pinned = day.start() - Duration::seconds(1);
    next_occurrence(task, pinned).filter(|at| CalendarDay::of(*at) == day)
}

/// Occurrence days of `task` within `[from, from + days)`.
pub fn occurrences_between(task: &Task, from: NaiveDate, days: usize) -> Vec<CalendarDay> {
    (0..days)
        .map(|i| CalendarDay::from(from + Duration::days(i as i64)))
        .filter(|day| is_due_on(task, *day))
        .collect()
}
