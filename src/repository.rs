//! The authoritative task and tag collections.
//!
//! A [`Repository`] is built once at startup and owned by the UI root. Every
//! mutation runs to completion, including the write of the full collection
//! to the blob store, before returning. A failed write surfaces as
//! [`Error::Persistence`] after the in-memory state has already changed.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::calendar::CalendarDay;
use crate::config::Config;
use crate::error::{Error, LimitedFeature, Result, ValidationError};
use crate::ledger;
use crate::limits::{self, Limits};
use crate::models::{NotificationHandle, Recurrence, Tag, TagDraft, TagId, TagUpdate, Task, TaskDraft, TaskId, TaskUpdate};
use crate::recurrence::{is_due, next_occurrence, occurrence_on, DueMode};
use crate::reminders::{reminder_instants, Notifier, Permission};
use crate::storage::{BlobStore, ALL_KEYS, PREMIUM_KEY, TAGS_KEY, TASKS_KEY};

type Clock = Box<dyn Fn() -> NaiveDateTime>;

/// Knobs for [`Repository::open`].
pub struct RepositoryOptions {
    pub notifications_enabled: bool,
    pub due_mode: DueMode,
    pub clock: Clock,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        RepositoryOptions {
            notifications_enabled: true,
            due_mode: DueMode::default(),
            clock: Box::new(|| Local::now().naive_local()),
        }
    }
}

impl RepositoryOptions {
    pub fn from_config(config: &Config) -> Self {
        RepositoryOptions {
            notifications_enabled: config.notifications,
            due_mode: config.due_mode,
            ..Default::default()
        }
    }

    /// Replaces the wall clock, e.g. with a fixed instant.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_due_mode(mut self, due_mode: DueMode) -> Self {
        self.due_mode = due_mode;
        self
    }
}

/// Tasks due on one day, split by completion.
#[derive(Debug)]
pub struct Agenda<'a> {
    pub day: CalendarDay,
    pub pending: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}

impl Agenda<'_> {
    pub fn len(&self) -> usize {
        self.pending.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts shown next to the tier's limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub tasks: usize,
    pub recurring_tasks: usize,
    pub tags: usize,
    pub is_premium: bool,
    pub limits: Limits,
}

pub struct Repository<S: BlobStore, N: Notifier> {
    store: S,
    notifier: N,
    tasks: Vec<Task>,
    tags: Vec<Tag>,
    premium: bool,
    permission: Permission,
    notifications_enabled: bool,
    due_mode: DueMode,
    clock: Clock,
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}

fn cap(limit: Option<usize>) -> usize {
    limit.unwrap_or(usize::MAX)
}

fn load_value<S: BlobStore, T: DeserializeOwned>(store: &S, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        None => Ok(None),
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| Error::Corrupt { key: key.to_string(), source }),
    }
}

fn validate_task(task: &Task) -> std::result::Result<(), ValidationError> {
    if task.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    task.recurrence.validate()
}

impl<S: BlobStore, N: Notifier> Repository<S, N> {
    /// Loads the persisted collections and asks for notification permission.
    ///
    /// Absent values start out empty (and not premium).
    pub fn open(store: S, mut notifier: N, options: RepositoryOptions) -> Result<Self> {
        let tasks: Vec<Task> = load_value(&store, TASKS_KEY)?.unwrap_or_default();
        let tags: Vec<Tag> = load_value(&store, TAGS_KEY)?.unwrap_or_default();
        let premium: bool = load_value(&store, PREMIUM_KEY)?.unwrap_or(false);

        let permission = notifier.request_permission();
        if permission == Permission::Denied {
            warn!("notification permission denied; reminders will be scheduled but not delivered");
        }
        info!(tasks = tasks.len(), tags = tags.len(), premium, "loaded reminder data");

        Ok(Repository {
            store,
            notifier,
            tasks,
            tags,
            premium,
            permission,
            notifications_enabled: options.notifications_enabled,
            due_mode: options.due_mode,
            clock: options.clock,
        })
    }

    /// Hands back the collaborators.
    pub fn close(self) -> (S, N) {
        debug!("closing repository");
        (self.store, self.notifier)
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn due_mode(&self) -> DueMode {
        self.due_mode
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    /// Looks a tag up by case-insensitive name.
    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        let name = name.trim();
        self.tags.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn tag_of(&self, task: &Task) -> Option<&Tag> {
        task.tag_id.and_then(|id| self.tag(id))
    }

    pub fn is_premium(&self) -> bool {
        self.premium
    }

    pub fn limits(&self) -> Limits {
        Limits::for_tier(self.premium)
    }

    pub fn recurring_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.recurrence.is_repeating()).count()
    }

    pub fn can_add_recurring_task(&self) -> bool {
        limits::can_add_recurring_task(
            self.premium,
            self.recurring_task_count(),
            cap(Limits::FREE.max_recurring_tasks),
        )
    }

    pub fn can_add_tag(&self) -> bool {
        limits::can_add_tag(self.premium, self.tags.len(), cap(Limits::FREE.max_tags))
    }

    pub fn stats(&self) -> Stats {
        Stats {
            tasks: self.tasks.len(),
            recurring_tasks: self.recurring_task_count(),
            tags: self.tags.len(),
            is_premium: self.premium,
            limits: self.limits(),
        }
    }

    /// Next occurrence of `task` relative to the repository clock.
    pub fn next_occurrence_of(&self, task: &Task) -> Option<NaiveDateTime> {
        next_occurrence(task, self.now())
    }

    /// Tasks due on `day`, ordered by time of day.
    pub fn tasks_due_on(&self, day: CalendarDay) -> Vec<&Task> {
        let now = self.now();
        let mut due: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| is_due(t, day, now, self.due_mode))
            .collect();
        due.sort_by_key(|t| {
            let at = match self.due_mode {
                DueMode::Reanchored => occurrence_on(t, day),
                DueMode::NextOccurrence => next_occurrence(t, now),
            };
            (at.map(|a| a.time()), t.id)
        });
        due
    }

    /// Tasks due on `day`, split into pending and completed.
    pub fn agenda(&self, day: CalendarDay) -> Agenda<'_> {
        let (completed, pending): (Vec<&Task>, Vec<&Task>) = self
            .tasks_due_on(day)
            .into_iter()
            .partition(|t| ledger::is_completed(t, day));
        Agenda { day, pending, completed }
    }

    pub fn is_task_completed_on(&self, task: &Task, day: CalendarDay) -> bool {
        ledger::is_completed(task, day)
    }

    /// Creates a task.
    ///
    /// Fails with `LimitExceeded` when a free user already has a recurring
    /// task, or selects too many monthly day numbers.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<&Task> {
        draft.validate()?;
        if let Some(tag_id) = draft.tag_id {
            if self.tag(tag_id).is_none() {
                return Err(Error::TagNotFound(tag_id));
            }
        }
        if draft.recurrence.is_repeating() && !self.can_add_recurring_task() {
            return Err(Error::limit(LimitedFeature::Recurrence));
        }
        self.check_monthly_days(&draft.recurrence)?;

        let now = self.now();
        let id = next_id(self.tasks.iter().map(|t| t.id));
        let mut task = Task {
            id,
            title: draft.title.trim().to_string(),
            anchor: draft.anchor,
            recurrence: draft.recurrence,
            tag_id: draft.tag_id,
            start_alarm: draft.start_alarm,
            reminders: draft.reminders,
            completed_days: BTreeSet::new(),
            notification_ids: Vec::new(),
            created_at: now,
        };
        task.notification_ids = self.schedule_notifications(&task, now);

        self.tasks.push(task);
        self.persist_tasks()?;
        debug!(task_id = id, "task added");
        let idx = self.tasks.len() - 1;
        Ok(&self.tasks[idx])
    }

    /// Applies `update` to a task and reschedules its notifications.
    ///
    /// The recurring-task limit is only consulted when a one-off task
    /// becomes repeating.
    pub fn update_task(&mut self, id: TaskId, update: TaskUpdate) -> Result<&Task> {
        let idx = self.task_position(id)?;
        if let Some(Some(tag_id)) = update.tag_id {
            if self.tag(tag_id).is_none() {
                return Err(Error::TagNotFound(tag_id));
            }
        }
        if let Some(recurrence) = &update.recurrence {
            let was_repeating = self.tasks[idx].recurrence.is_repeating();
            if !was_repeating && recurrence.is_repeating() && !self.can_add_recurring_task() {
                return Err(Error::limit(LimitedFeature::Recurrence));
            }
            self.check_monthly_days(recurrence)?;
        }

        let mut updated = self.tasks[idx].clone();
        update.apply_to(&mut updated);
        validate_task(&updated)?;

        let now = self.now();
        let old_handles = std::mem::take(&mut updated.notification_ids);
        self.cancel_notifications(&old_handles);
        updated.notification_ids = self.schedule_notifications(&updated, now);

        self.tasks[idx] = updated;
        self.persist_tasks()?;
        debug!(task_id = id, "task updated");
        Ok(&self.tasks[idx])
    }

    /// Removes a task and cancels its notifications.
    pub fn delete_task(&mut self, id: TaskId) -> Result<()> {
        let idx = self.task_position(id)?;
        let task = self.tasks.remove(idx);
        self.cancel_notifications(&task.notification_ids);
        self.persist_tasks()?;
        debug!(task_id = id, "task deleted");
        Ok(())
    }

    /// Flips completion of the task's occurrence on `day`.
    ///
    /// # Returns
    /// Whether the occurrence is now complete.
    pub fn toggle_task_complete(&mut self, id: TaskId, day: CalendarDay) -> Result<bool> {
        let idx = self.task_position(id)?;
        let done = ledger::toggle(&mut self.tasks[idx], day);
        self.persist_tasks()?;
        debug!(task_id = id, %day, done, "completion toggled");
        Ok(done)
    }

    pub fn add_tag(&mut self, draft: TagDraft) -> Result<&Tag> {
        draft.validate()?;
        if !self.can_add_tag() {
            return Err(Error::limit(LimitedFeature::Tag));
        }
        let id = next_id(self.tags.iter().map(|t| t.id));
        let tag = Tag {
            id,
            name: draft.name.trim().to_string(),
            color_index: draft.color_index,
            created_at: self.now(),
        };
        self.tags.push(tag);
        self.persist_tags()?;
        debug!(tag_id = id, "tag added");
        let idx = self.tags.len() - 1;
        Ok(&self.tags[idx])
    }

    pub fn update_tag(&mut self, id: TagId, update: TagUpdate) -> Result<&Tag> {
        update.validate()?;
        let idx = self
            .tags
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::TagNotFound(id))?;
        let tag = &mut self.tags[idx];
        if let Some(name) = update.name { tag.name = name.trim().to_string(); }
        if let Some(color) = update.color_index { tag.color_index = color; }
        self.persist_tags()?;
        debug!(tag_id = id, "tag updated");
        Ok(&self.tags[idx])
    }

    /// Removes a tag and clears it from every task filed under it.
    ///
    /// Tags and tasks are written together in one store update.
    pub fn delete_tag(&mut self, id: TagId) -> Result<()> {
        let len_before = self.tags.len();
        self.tags.retain(|t| t.id != id);
        if self.tags.len() == len_before {
            return Err(Error::TagNotFound(id));
        }

        let mut cleared = 0;
        for t in self.tasks.iter_mut() {
            if t.tag_id == Some(id) {
                t.tag_id = None;
                cleared += 1;
            }
        }

        let tags = serde_json::to_vec_pretty(&self.tags)?;
        let tasks = serde_json::to_vec_pretty(&self.tasks)?;
        self.store.set_many(&[(TAGS_KEY, tags), (TASKS_KEY, tasks)])?;
        debug!(tag_id = id, cleared, "tag deleted");
        Ok(())
    }

    /// Lifts every free-tier limit.
    pub fn upgrade_to_premium(&mut self) -> Result<()> {
        self.premium = true;
        let bytes = serde_json::to_vec(&self.premium)?;
        self.store.set(PREMIUM_KEY, &bytes)?;
        info!("upgraded to premium");
        Ok(())
    }

    /// Cancels all notifications and wipes tasks, tags and the premium flag.
    pub fn clear_all_data(&mut self) -> Result<()> {
        let handles: Vec<NotificationHandle> = self
            .tasks
            .iter()
            .flat_map(|t| t.notification_ids.iter().cloned())
            .collect();
        self.cancel_notifications(&handles);

        self.tasks.clear();
        self.tags.clear();
        self.premium = false;
        self.store.remove(&ALL_KEYS)?;
        info!("all data cleared");
        Ok(())
    }

    fn task_position(&self, id: TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::TaskNotFound(id))
    }

    fn check_monthly_days(&self, recurrence: &Recurrence) -> Result<()> {
        let selected = recurrence.monthly_day_count();
        if !limits::can_select_monthly_days(self.premium, selected, cap(Limits::FREE.max_monthly_days)) {
            return Err(Error::limit(LimitedFeature::MonthlyDates));
        }
        Ok(())
    }

    /// Schedules the task's start alarm and reminders. Failures are logged
    /// and skipped.
    fn schedule_notifications(&mut self, task: &Task, now: NaiveDateTime) -> Vec<NotificationHandle> {
        if !self.notifications_enabled {
            return Vec::new();
        }
        let mut handles = Vec::new();
        for planned in reminder_instants(task, now) {
            match self.notifier.schedule(planned.at, &planned.payload) {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(task_id = task.id, at = %planned.at, error = %e, "failed to schedule notification"),
            }
        }
        handles
    }

    fn cancel_notifications(&mut self, handles: &[NotificationHandle]) {
        if handles.is_empty() {
            return;
        }
        if let Err(e) = self.notifier.cancel_many(handles) {
            warn!(count = handles.len(), error = %e, "failed to cancel notifications");
        }
    }

    fn persist_tasks(&mut self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.tasks)?;
        self.store.set(TASKS_KEY, &bytes)?;
        Ok(())
    }

    fn persist_tags(&mut self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.tags)?;
        self.store.set(TAGS_KEY, &bytes)?;
        Ok(())
    }
}
