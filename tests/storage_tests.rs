use chrono::NaiveDate;
use remindust::config::{Config, CONFIG_FILE};
use remindust::recurrence::DueMode;
use remindust::reminders::{NotificationPayload, Notifier, OutboxNotifier};
use remindust::storage::{BlobStore, FileBlobStore, ALL_KEYS, TAGS_KEY, TASKS_KEY};
use std::fs;

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileBlobStore::open(dir.path().join("data")).unwrap();
    assert!(store.dir().exists());
    assert_eq!(store.get(TASKS_KEY).unwrap(), None);

    store.set(TASKS_KEY, b"[1,2,3]").unwrap();
    assert_eq!(store.get(TASKS_KEY).unwrap(), Some(b"[1,2,3]".to_vec()));
    assert!(store.dir().join("tasks.json").exists());

    store.set(TASKS_KEY, b"[]").unwrap();
    assert_eq!(store.get(TASKS_KEY).unwrap(), Some(b"[]".to_vec()));

    store
        .set_many(&[(TAGS_KEY, b"[\"a\"]".to_vec()), (TASKS_KEY, b"[4]".to_vec())])
        .unwrap();
    assert_eq!(store.get(TAGS_KEY).unwrap(), Some(b"[\"a\"]".to_vec()));
    assert_eq!(store.get(TASKS_KEY).unwrap(), Some(b"[4]".to_vec()));

    // No staging files left behind
    let leftovers = fs::read_dir(store.dir())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);

    store.remove(&ALL_KEYS).unwrap();
    assert_eq!(store.get(TASKS_KEY).unwrap(), None);
    assert_eq!(store.get(TAGS_KEY).unwrap(), None);
}

#[test]
fn test_config_defaults_and_overrides() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(Config::load(dir.path()).unwrap(), Config::default());

    fs::write(
        dir.path().join(CONFIG_FILE),
        "notifications = false\ndue_mode = \"next_occurrence\"\n",
    )
    .unwrap();
    let config = Config::load(dir.path()).unwrap();
    assert!(!config.notifications);
    assert_eq!(config.due_mode, DueMode::NextOccurrence);
    assert_eq!(config.date_strip_days, 14);

    assert!(Config::parse("date_strip_days = \"many\"").is_err());
}

#[test]
fn test_outbox_schedule_and_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let mut outbox = OutboxNotifier::new(dir.path());
    assert!(outbox.pending().unwrap().is_empty());

    let payload = NotificationPayload {
        task_id: 1,
        title: "Reminder".into(),
        body: "Standup".into(),
        is_start_alarm: false,
    };
    let late = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
    let early = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(8, 30, 0).unwrap();
    let a = outbox.schedule(late, &payload).unwrap();
    let b = outbox.schedule(early, &payload).unwrap();
    assert_ne!(a, b);

    let pending = outbox.pending().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].at, early);
    assert_eq!(pending[0].handle, b);

    outbox.cancel(&b).unwrap();
    let pending = outbox.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].handle, a);

    outbox.clear().unwrap();
    assert!(outbox.pending().unwrap().is_empty());
}
