use chrono::{NaiveDate, NaiveDateTime};
use remindust::calendar::CalendarDay;
use remindust::commands::*;
use remindust::error::Error;
use remindust::models::{Recurrence, RecurrenceKind, Reminder, TAG_PALETTE, TAG_PALETTE_LEN};
use remindust::reminders::OutboxNotifier;
use remindust::storage::FileBlobStore;
use remindust::{Repository, RepositoryOptions};
use std::path::Path;

fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

/// Monday morning.
fn now() -> NaiveDateTime {
    dt(2024, 1, 15, 8, 2)
}

fn open_at(dir: &Path) -> LocalRepository {
    let store = FileBlobStore::open(dir).unwrap();
    let notifier = OutboxNotifier::new(dir);
    Repository::open(store, notifier, RepositoryOptions::default().with_clock(now)).unwrap()
}

fn with_test_db<F>(f: F)
where
    F: FnOnce(&Path, LocalRepository),
{
    let dir = tempfile::tempdir().unwrap();
    let repo = open_at(dir.path());
    f(dir.path(), repo);
}

#[test]
fn test_add_and_list() {
    with_test_db(|dir, mut repo| {
        let id = cmd_add(&mut repo, "Test Task".into(), Some("2024-01-15 18:30".into()), "none".into(), None, None, false, vec![], true).unwrap();
        assert_eq!(id, 1);

        let repo = open_at(dir);
        assert_eq!(repo.tasks().len(), 1);
        assert_eq!(repo.tasks()[0].title, "Test Task");
        assert_eq!(repo.tasks()[0].anchor, dt(2024, 1, 15, 18, 30));
        assert_eq!(repo.tasks_due_on(CalendarDay::of(now())).len(), 1);
        cmd_list(&repo, Some("today".into())).unwrap();
    });
}

#[test]
fn test_add_without_time_rounds_now() {
    with_test_db(|_dir, mut repo| {
        let id = cmd_add(&mut repo, "Quick".into(), None, "none".into(), None, None, false, vec![], true).unwrap();
        assert_eq!(repo.task(id).unwrap().anchor, dt(2024, 1, 15, 8, 0));
    });
}

#[test]
fn test_add_weekly_with_days() {
    with_test_db(|_dir, mut repo| {
        let id = cmd_add(&mut repo, "Gym".into(), Some("07:00".into()), "weekly".into(), Some("mon,wed".into()), None, false, vec![], true).unwrap();
        assert_eq!(repo.task(id).unwrap().recurrence, Recurrence::weekly([1, 3]));

        // Second recurring task hits the free limit
        let err = cmd_add(&mut repo, "Yoga".into(), None, "yearly".into(), None, None, false, vec![], true).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    });
}

#[test]
fn test_add_next_week_on_weekday() {
    with_test_db(|_dir, mut repo| {
        let id = cmd_add(&mut repo, "Trip".into(), Some("10:00".into()), "next-week".into(), Some("wed".into()), None, false, vec![], true).unwrap();
        let task = repo.task(id).unwrap();
        assert_eq!(task.anchor, dt(2024, 1, 24, 10, 0));
        assert_eq!(task.recurrence, Recurrence::NextWeekOnce);
    });
}

#[test]
fn test_add_rejects_bad_input() {
    with_test_db(|_dir, mut repo| {
        let err = cmd_add(&mut repo, "X".into(), None, "fortnightly".into(), None, None, false, vec![], true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.exit_code(), 2);

        let err = cmd_add(&mut repo, "X".into(), None, "none".into(), None, None, false, vec!["5w".into()], true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = cmd_add(&mut repo, "X".into(), None, "none".into(), None, Some("Nope".into()), false, vec![], true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // next-week takes exactly one weekday in 0..=6
        let err = cmd_add(&mut repo, "X".into(), None, "next-week".into(), Some("9".into()), None, false, vec![], true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = cmd_add(&mut repo, "X".into(), None, "next-week".into(), Some("mon,wed".into()), None, false, vec![], true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(repo.tasks().is_empty());
    });
}

#[test]
fn test_complete_task() {
    with_test_db(|dir, mut repo| {
        let id = cmd_add(&mut repo, "Gym".into(), Some("07:00".into()), "weekly".into(), Some("mon,wed".into()), None, false, vec![], true).unwrap();

        // Due today (Monday 07:00) even though the slot has passed
        assert!(cmd_complete(&mut repo, id, None, true).unwrap());
        let repo = open_at(dir);
        let monday = CalendarDay::from_ymd(2024, 1, 15).unwrap();
        assert!(repo.task(id).unwrap().completed_days.contains(&monday));

        let mut repo = repo;
        assert!(cmd_complete(&mut repo, id, Some("2024-01-17".into()), true).unwrap());
        assert!(!cmd_complete(&mut repo, id, Some("today".into()), true).unwrap());
        let wednesday = CalendarDay::from_ymd(2024, 1, 17).unwrap();
        assert_eq!(repo.task(id).unwrap().completed_days.iter().collect::<Vec<_>>(), vec![&wednesday]);

        // Not due today: the next occurrence's day is toggled
        let later = cmd_add(&mut repo, "Dentist".into(), Some("2024-01-18 14:00".into()), "none".into(), None, None, false, vec![], true).unwrap();
        assert!(cmd_complete(&mut repo, later, None, true).unwrap());
        let thursday = CalendarDay::from_ymd(2024, 1, 18).unwrap();
        assert!(repo.task(later).unwrap().completed_days.contains(&thursday));
    });
}

#[test]
fn test_edit_task() {
    with_test_db(|_dir, mut repo| {
        let id = cmd_add(&mut repo, "Old Name".into(), Some("2024-01-16 09:00".into()), "none".into(), None, None, false, vec![], true).unwrap();

        let args = EditArgs {
            title: Some("New Name".into()),
            at: Some("2024-01-16 10:00".into()),
            start_alarm: Some(true),
            remind: Some(vec!["15m".into()]),
            ..Default::default()
        };
        cmd_edit(&mut repo, id, args, true).unwrap();

        let task = repo.task(id).unwrap();
        assert_eq!(task.title, "New Name");
        assert_eq!(task.anchor, dt(2024, 1, 16, 10, 0));
        assert_eq!(task.reminders, vec![Reminder::Minutes { value: 15 }]);
        assert_eq!(task.notification_ids.len(), 2);
        assert_eq!(repo.notifier().pending().unwrap().len(), 2);

        assert!(matches!(cmd_edit(&mut repo, 42, EditArgs::default(), true), Err(Error::TaskNotFound(42))));
    });
}

#[test]
fn test_remove_task_clears_outbox() {
    with_test_db(|_dir, mut repo| {
        let id = cmd_add(&mut repo, "Standup".into(), Some("09:00".into()), "none".into(), None, None, true, vec!["10m".into()], true).unwrap();
        assert_eq!(repo.notifier().pending().unwrap().len(), 2);

        cmd_remove(&mut repo, id, true).unwrap();
        assert!(repo.tasks().is_empty());
        assert!(repo.notifier().pending().unwrap().is_empty());
    });
}

#[test]
fn test_tag_remove_clears_tasks() {
    with_test_db(|dir, mut repo| {
        let tag = cmd_tag_add(&mut repo, "Home".into(), 2, true).unwrap();
        assert!(cmd_tag_add(&mut repo, "home".into(), 1, true).is_err());

        let id = cmd_add(&mut repo, "Dishes".into(), None, "none".into(), None, Some("home".into()), false, vec![], true).unwrap();
        assert_eq!(repo.task(id).unwrap().tag_id, Some(tag));

        cmd_tag_edit(&mut repo, "Home".into(), Some("House".into()), None, true).unwrap();
        assert_eq!(repo.tag(tag).unwrap().name, "House");

        cmd_tag_remove(&mut repo, "House".into(), true).unwrap();
        let repo = open_at(dir);
        assert!(repo.tags().is_empty());
        assert_eq!(repo.task(id).unwrap().tag_id, None);
    });
}

#[test]
fn test_premium_upgrade_persists() {
    with_test_db(|dir, mut repo| {
        cmd_premium(&mut repo, true, true).unwrap();
        let repo = open_at(dir);
        assert!(repo.is_premium());
    });
}

#[test]
fn test_reset_wipes_everything() {
    with_test_db(|dir, mut repo| {
        cmd_add(&mut repo, "Standup".into(), Some("09:00".into()), "none".into(), None, None, true, vec![], true).unwrap();
        cmd_tag_add(&mut repo, "Work".into(), 0, true).unwrap();

        cmd_reset(&mut repo, true).unwrap();
        let repo = open_at(dir);
        assert!(repo.tasks().is_empty());
        assert!(repo.tags().is_empty());
        assert!(repo.notifier().pending().unwrap().is_empty());
    });
}

#[test]
fn test_tag_colors_match_across_views() {
    for index in 0..TAG_PALETTE_LEN {
        let (r, g, b) = TAG_PALETTE[index];
        assert_eq!(tag_color(index), comfy_table::Color::Rgb { r, g, b });
        assert_eq!(remindust::tui::ui::tag_color(index), ratatui::style::Color::Rgb(r, g, b));
    }
    assert_eq!(tag_color(TAG_PALETTE_LEN), comfy_table::Color::Reset);
    assert_eq!(remindust::tui::ui::tag_color(TAG_PALETTE_LEN), ratatui::style::Color::Reset);
}

#[test]
fn test_parse_helpers() {
    let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    assert_eq!(parse_day("tomorrow", today).unwrap(), CalendarDay::from_ymd(2024, 2, 1).unwrap());
    assert_eq!(parse_day("2024-03-05", today).unwrap(), CalendarDay::from_ymd(2024, 3, 5).unwrap());
    assert!(parse_day("03/05", today).is_err());

    assert_eq!(parse_at("2024-02-01 07:15", today).unwrap(), dt(2024, 2, 1, 7, 15));
    assert_eq!(parse_at("2024-02-01T07:15", today).unwrap(), dt(2024, 2, 1, 7, 15));
    assert_eq!(parse_at("2024-02-01", today).unwrap(), dt(2024, 2, 1, 9, 0));
    assert_eq!(parse_at("18:45", today).unwrap(), dt(2024, 1, 31, 18, 45));
    assert!(parse_at("soon", today).is_err());

    let anchor = dt(2024, 1, 31, 9, 0);
    assert_eq!(build_recurrence(RecurrenceKind::Weekly, None, anchor).unwrap(), Recurrence::weekly([3]));
    assert_eq!(build_recurrence(RecurrenceKind::Monthly, None, anchor).unwrap(), Recurrence::monthly([31]));
    assert_eq!(
        build_recurrence(RecurrenceKind::Monthly, Some("1, 15"), anchor).unwrap(),
        Recurrence::monthly([1, 15])
    );
}
