use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use remindust::calendar::{at_time_of, weekday_index, CalendarDay};
use remindust::models::{Recurrence, Task};
use remindust::recurrence::*;

fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> CalendarDay {
    CalendarDay::from_ymd(y, m, d).unwrap()
}

fn task(anchor: NaiveDateTime, recurrence: Recurrence) -> Task {
    Task {
        id: 1,
        title: "Test".into(),
        anchor,
        recurrence,
        tag_id: None,
        start_alarm: false,
        reminders: Vec::new(),
        completed_days: BTreeSet::new(),
        notification_ids: Vec::new(),
        created_at: anchor,
    }
}

/// Instants spread over several weeks, at varied times of day.
fn sample_nows() -> Vec<NaiveDateTime> {
    let start = dt(2024, 1, 25, 0, 0);
    (0..120).map(|i| start + Duration::minutes(i * 397)).collect()
}

#[test]
fn test_none_returns_anchor_regardless_of_now() {
    let anchor = dt(2024, 1, 15, 9, 0);
    let t = task(anchor, Recurrence::None);
    assert_eq!(next_occurrence(&t, dt(2020, 1, 1, 0, 0)), Some(anchor));
    assert_eq!(next_occurrence(&t, anchor), Some(anchor));
    assert_eq!(next_occurrence(&t, dt(2030, 1, 1, 0, 0)), Some(anchor));
}

#[test]
fn test_next_week_once_lapses_after_anchor() {
    let anchor = dt(2024, 1, 22, 9, 0);
    let t = task(anchor, Recurrence::NextWeekOnce);
    assert_eq!(next_occurrence(&t, dt(2024, 1, 15, 9, 0)), Some(anchor));
    assert_eq!(next_occurrence(&t, anchor), Some(anchor));
    assert_eq!(next_occurrence(&t, anchor + Duration::minutes(1)), None);
    for now in sample_nows() {
        assert_eq!(next_occurrence(&t, now).is_none(), anchor < now);
    }
}

#[test]
fn test_weekly_picks_next_selected_weekday() {
    let t = task(dt(2024, 1, 15, 9, 0), Recurrence::weekly([1, 3]));
    // Monday after 9am -> Wednesday
    assert_eq!(next_occurrence(&t, dt(2024, 1, 15, 10, 0)), Some(dt(2024, 1, 17, 9, 0)));
    // Monday before 9am -> same day
    assert_eq!(next_occurrence(&t, dt(2024, 1, 15, 8, 0)), Some(dt(2024, 1, 15, 9, 0)));
    // Exactly at the occurrence is not "next"
    assert_eq!(next_occurrence(&t, dt(2024, 1, 15, 9, 0)), Some(dt(2024, 1, 17, 9, 0)));
    // Thursday -> next Monday
    assert_eq!(next_occurrence(&t, dt(2024, 1, 18, 12, 0)), Some(dt(2024, 1, 22, 9, 0)));
}

#[test]
fn test_weekly_falls_back_to_next_week() {
    let t = task(dt(2024, 1, 15, 9, 0), Recurrence::weekly([1]));
    assert_eq!(next_occurrence(&t, dt(2024, 1, 15, 10, 0)), Some(dt(2024, 1, 22, 9, 0)));
}

#[test]
fn test_weekly_wraps_year() {
    let t = task(dt(2024, 1, 15, 9, 0), Recurrence::weekly([3]));
    // Sunday 2024-12-29 -> Wednesday 2025-01-01
    assert_eq!(next_occurrence(&t, dt(2024, 12, 29, 12, 0)), Some(dt(2025, 1, 1, 9, 0)));
}

#[test]
fn test_weekly_is_earliest_strictly_after_now() {
    let selections: [&[u8]; 4] = [&[0], &[1, 3], &[6, 0], &[0, 1, 2, 3, 4, 5, 6]];
    for days in selections {
        let set: BTreeSet<u8> = days.iter().copied().collect();
        let t = task(dt(2024, 1, 15, 9, 30), Recurrence::Weekly { days: set.clone() });
        for now in sample_nows() {
            let next = next_occurrence(&t, now).unwrap();
            assert!(next > now);
            assert!(set.contains(&weekday_index(next.date())));
            assert_eq!((next.hour(), next.minute()), (9, 30));

            let expected = (0..=7)
                .map(|i| at_time_of(now.date() + Duration::days(i), t.anchor))
                .find(|c| *c > now && set.contains(&weekday_index(c.date())))
                .unwrap();
            assert_eq!(next, expected, "days {:?}, now {}", days, now);
        }
    }
}

#[test]
fn test_monthly_skips_short_months() {
    let t = task(dt(2024, 1, 31, 9, 0), Recurrence::monthly([31]));
    // April has 30 days
    assert_eq!(next_occurrence(&t, dt(2024, 4, 10, 12, 0)), Some(dt(2024, 5, 31, 9, 0)));
}

#[test]
fn test_monthly_searches_past_next_month() {
    let t = task(dt(2024, 1, 30, 9, 0), Recurrence::monthly([30]));
    // No Feb 30: lands in March
    assert_eq!(next_occurrence(&t, dt(2024, 1, 31, 12, 0)), Some(dt(2024, 3, 30, 9, 0)));
}

#[test]
fn test_monthly_order_and_year_wrap() {
    let t = task(dt(2024, 1, 1, 9, 0), Recurrence::monthly([15, 1]));
    assert_eq!(next_occurrence(&t, dt(2024, 1, 10, 12, 0)), Some(dt(2024, 1, 15, 9, 0)));
    assert_eq!(next_occurrence(&t, dt(2024, 1, 15, 9, 0)), Some(dt(2024, 2, 1, 9, 0)));
    assert_eq!(next_occurrence(&t, dt(2024, 12, 20, 12, 0)), Some(dt(2025, 1, 1, 9, 0)));
}

#[test]
fn test_monthly_is_earliest_strictly_after_now() {
    let selections: [&[u8]; 4] = [&[1], &[29], &[10, 20, 31], &[30, 31]];
    for days in selections {
        let set: BTreeSet<u8> = days.iter().copied().collect();
        let t = task(dt(2024, 1, 1, 18, 45), Recurrence::Monthly { days: set.clone() });
        for now in sample_nows() {
            let next = next_occurrence(&t, now).unwrap();
            assert!(next > now);
            assert!(set.contains(&(next.day() as u8)));

            let expected = (0..=93)
                .map(|i| at_time_of(now.date() + Duration::days(i), t.anchor))
                .find(|c| *c > now && set.contains(&(c.day() as u8)))
                .unwrap();
            assert_eq!(next, expected, "days {:?}, now {}", days, now);
        }
    }
}

#[test]
fn test_yearly_rolls_to_next_year() {
    let t = task(dt(2020, 3, 10, 8, 0), Recurrence::Yearly);
    assert_eq!(next_occurrence(&t, dt(2024, 1, 1, 0, 0)), Some(dt(2024, 3, 10, 8, 0)));
    assert_eq!(next_occurrence(&t, dt(2024, 3, 10, 8, 0)), Some(dt(2024, 3, 10, 8, 0)));
    assert_eq!(next_occurrence(&t, dt(2024, 5, 1, 0, 0)), Some(dt(2025, 3, 10, 8, 0)));
}

#[test]
fn test_yearly_leap_day_waits_for_leap_year() {
    let t = task(dt(2020, 2, 29, 10, 0), Recurrence::Yearly);
    assert_eq!(next_occurrence(&t, dt(2025, 1, 1, 0, 0)), Some(dt(2028, 2, 29, 10, 0)));
}

#[test]
fn test_is_due_on_every_matching_day() {
    let weekly = task(dt(2024, 1, 15, 9, 0), Recurrence::weekly([1, 3]));
    assert!(is_due_on(&weekly, day(2024, 1, 15)));
    assert!(is_due_on(&weekly, day(2024, 1, 17)));
    assert!(is_due_on(&weekly, day(2024, 1, 22)));
    assert!(!is_due_on(&weekly, day(2024, 1, 23)));

    let monthly = task(dt(2024, 1, 31, 0, 0), Recurrence::monthly([31]));
    assert!(is_due_on(&monthly, day(2024, 3, 31)));
    assert!(!is_due_on(&monthly, day(2024, 4, 30)));

    let once = task(dt(2024, 1, 15, 9, 0), Recurrence::None);
    assert!(is_due_on(&once, day(2024, 1, 15)));
    assert!(!is_due_on(&once, day(2024, 1, 16)));

    let next_week = task(dt(2024, 1, 22, 23, 59), Recurrence::NextWeekOnce);
    assert!(is_due_on(&next_week, day(2024, 1, 22)));
    assert!(!is_due_on(&next_week, day(2024, 1, 23)));

    let yearly = task(dt(2020, 1, 1, 7, 0), Recurrence::Yearly);
    assert!(is_due_on(&yearly, day(2024, 1, 1)));
    assert!(is_due_on(&yearly, day(2025, 1, 1)));
    assert!(!is_due_on(&yearly, day(2024, 1, 2)));
}

#[test]
fn test_next_occurrence_mode_only_shows_next_day() {
    let weekly = task(dt(2024, 1, 15, 9, 0), Recurrence::weekly([1, 3]));
    let now = dt(2024, 1, 15, 10, 0);
    assert!(next_occurrence_falls_on(&weekly, day(2024, 1, 17), now));
    assert!(!next_occurrence_falls_on(&weekly, day(2024, 1, 22), now));
    assert!(!is_due(&weekly, day(2024, 1, 22), now, DueMode::NextOccurrence));
    assert!(is_due(&weekly, day(2024, 1, 22), now, DueMode::Reanchored));
}

#[test]
fn test_occurrence_on_and_range() {
    let weekly = task(dt(2024, 1, 15, 9, 0), Recurrence::weekly([1, 3]));
    assert_eq!(occurrence_on(&weekly, day(2024, 1, 17)), Some(dt(2024, 1, 17, 9, 0)));
    assert_eq!(occurrence_on(&weekly, day(2024, 1, 18)), None);

    let from = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
    let days = occurrences_between(&weekly, from, 14);
    assert_eq!(
        days,
        vec![day(2024, 1, 15), day(2024, 1, 17), day(2024, 1, 22), day(2024, 1, 24)]
    );
}
