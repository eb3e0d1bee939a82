use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::NotifyError;
use crate::models::{NotificationHandle, Task, TaskId};
use crate::recurrence::next_occurrence;

/// What a delivered notification shows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub task_id: TaskId,
    pub title: String,
    pub body: String,
    pub is_start_alarm: bool,
}

/// A notification the task wants delivered at `at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotification {
    pub at: NaiveDateTime,
    pub payload: NotificationPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Delivers notifications at given instants. Implemented by the host.
pub trait Notifier {
    fn schedule(&mut self, at: NaiveDateTime, payload: &NotificationPayload) -> Result<NotificationHandle, NotifyError>;

    fn cancel(&mut self, handle: &str) -> Result<(), NotifyError>;

    fn cancel_many(&mut self, handles: &[NotificationHandle]) -> Result<(), NotifyError> {
        for handle in handles {
            self.cancel(handle)?;
        }
        Ok(())
    }

    /// Asked once at startup. Denial only suppresses delivery.
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }
}

/// Notifications to schedule for `task`, relative to `now`.
///
/// The start alarm fires at the next occurrence; relative reminders fire
/// ahead of it. Anything not strictly after `now` is dropped, as are
/// relative reminders of a task without a next occurrence and reminders
/// whose offset overflows the calendar.
pub fn reminder_instants(task: &Task, now: NaiveDateTime) -> Vec<PlannedNotification> {
    let occurrence = next_occurrence(task, now);
    let mut planned = Vec::new();

    if task.start_alarm {
        if let Some(at) = occurrence {
            planned.push(PlannedNotification {
                at,
                payload: NotificationPayload {
                    task_id: task.id,
                    title: "Time to start".to_string(),
                    body: task.title.clone(),
                    is_start_alarm: true,
                },
            });
        }
    }

    for reminder in &task.reminders {
        let fire_at = match (reminder.is_relative(), occurrence) {
            (true, Some(occ)) => reminder.fire_at(occ),
            (true, None) => continue,
            (false, _) => reminder.fire_at(task.anchor),
        };
        let Some(at) = fire_at else {
            warn!(task_id = task.id, %reminder, "reminder offset out of range; skipped");
            continue;
        };
        planned.push(PlannedNotification {
            at,
            payload: NotificationPayload {
                task_id: task.id,
                title: "Reminder".to_string(),
                body: task.title.clone(),
                is_start_alarm: false,
            },
        });
    }

    planned.retain(|p| p.at > now);
    planned
}

/// A scheduled entry in the outbox.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub handle: NotificationHandle,
    pub at: NaiveDateTime,
    pub payload: NotificationPayload,
}

/// Records scheduled notifications in `outbox.json` so another process
/// (or the `reminders` command) can pick them up.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
    permission: Permission,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let mut path = dir.into();
        path.push("outbox.json");
        OutboxNotifier { path, permission: Permission::Granted }
    }

    /// Pending entries sorted by firing time.
    pub fn pending(&self) -> Result<Vec<OutboxEntry>, NotifyError> {
        let mut entries = self.load()?;
        entries.sort_by(|a, b| a.at.cmp(&b.at));
        Ok(entries)
    }

    /// Drops every pending entry.
    pub fn clear(&mut self) -> Result<(), NotifyError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| NotifyError(e.to_string()))?;
        }
        Ok(())
    }

    fn load(&self) -> Result<Vec<OutboxEntry>, NotifyError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut f = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .map_err(|e| NotifyError(e.to_string()))?;
        let mut s = String::new();
        f.read_to_string(&mut s).map_err(|e| NotifyError(e.to_string()))?;
        serde_json::from_str(&s).map_err(|e| NotifyError(e.to_string()))
    }

    fn save(&self, entries: &[OutboxEntry]) -> Result<(), NotifyError> {
        let s = serde_json::to_string_pretty(entries).map_err(|e| NotifyError(e.to_string()))?;
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| NotifyError(e.to_string()))?;
        f.write_all(s.as_bytes()).map_err(|e| NotifyError(e.to_string()))
    }
}

impl Notifier for OutboxNotifier {
    fn schedule(&mut self, at: NaiveDateTime, payload: &NotificationPayload) -> Result<NotificationHandle, NotifyError> {
        let mut entries = self.load()?;
        let handle = uuid::Uuid::new_v4().to_string();
        entries.push(OutboxEntry { handle: handle.clone(), at, payload: payload.clone() });
        self.save(&entries)?;
        Ok(handle)
    }

    fn cancel(&mut self, handle: &str) -> Result<(), NotifyError> {
        self.cancel_many(&[handle.to_string()])
    }

    fn cancel_many(&mut self, handles: &[NotificationHandle]) -> Result<(), NotifyError> {
        if handles.is_empty() {
            return Ok(());
        }
        let mut entries = self.load()?;
        entries.retain(|e| !handles.contains(&e.handle));
        self.save(&entries)
    }

    fn request_permission(&mut self) -> Permission {
        self.permission
    }
}
