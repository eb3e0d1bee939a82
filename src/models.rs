use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarDay, WEEKDAY_LABELS};
use crate::error::ValidationError;

pub type TaskId = u64;
pub type TagId = u64;

/// Opaque handle returned by the notification scheduler.
pub type NotificationHandle = String;

/// Tag colors as RGB, indexed by `Tag::color_index`. Every view renders
/// tags from this table.
pub const TAG_PALETTE: [(u8, u8, u8); 8] = [
    (0xBE, 0x12, 0x3C), // rose
    (0xA1, 0x62, 0x07), // amber
    (0x04, 0x78, 0x57), // mint
    (0x43, 0x38, 0xCA), // indigo
    (0xC2, 0x41, 0x0C), // orange
    (0x0E, 0x74, 0x90), // cyan
    (0x7C, 0x3A, 0xED), // lavender
    (0x4D, 0x7C, 0x0F), // lime
];

/// Number of colors in the tag palette.
pub const TAG_PALETTE_LEN: usize = TAG_PALETTE.len();

/// The enumerated pattern governing how a task repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceKind {
    None,
    NextWeekOnce,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for RecurrenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "once" => Ok(RecurrenceKind::None),
            "next-week" | "next_week" | "nextweek" | "next-week-once" => Ok(RecurrenceKind::NextWeekOnce),
            "weekly" => Ok(RecurrenceKind::Weekly),
            "monthly" => Ok(RecurrenceKind::Monthly),
            "yearly" => Ok(RecurrenceKind::Yearly),
            other => Err(format!(
                "Unknown repeat pattern '{}'. Supported: none, next-week, weekly, monthly, yearly.",
                other
            )),
        }
    }
}

/// Recurrence rule of a task.
///
/// Weekly days are weekday indices (Sunday = 0), monthly days are day
/// numbers 1..=31. Only the variant in use carries a day set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    NextWeekOnce,
    Weekly { days: BTreeSet<u8> },
    Monthly { days: BTreeSet<u8> },
    Yearly,
}

impl Recurrence {
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Recurrence::None => RecurrenceKind::None,
            Recurrence::NextWeekOnce => RecurrenceKind::NextWeekOnce,
            Recurrence::Weekly { .. } => RecurrenceKind::Weekly,
            Recurrence::Monthly { .. } => RecurrenceKind::Monthly,
            Recurrence::Yearly => RecurrenceKind::Yearly,
        }
    }

    /// Anything but `None` counts against the recurring-task limit.
    pub fn is_repeating(&self) -> bool {
        !matches!(self, Recurrence::None)
    }

    pub fn weekly<I: IntoIterator<Item = u8>>(days: I) -> Self {
        Recurrence::Weekly { days: days.into_iter().collect() }
    }

    pub fn monthly<I: IntoIterator<Item = u8>>(days: I) -> Self {
        Recurrence::Monthly { days: days.into_iter().collect() }
    }

    /// Number of selected monthly day numbers (zero for other kinds).
    pub fn monthly_day_count(&self) -> usize {
        match self {
            Recurrence::Monthly { days } => days.len(),
            _ => 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Recurrence::Weekly { days } => {
                if days.is_empty() {
                    return Err(ValidationError::NoWeekdays);
                }
                if let Some(&bad) = days.iter().find(|&&d| d > 6) {
                    return Err(ValidationError::WeekdayOutOfRange(bad));
                }
            }
            Recurrence::Monthly { days } => {
                if days.is_empty() {
                    return Err(ValidationError::NoMonthDays);
                }
                if let Some(&bad) = days.iter().find(|&&d| !(1..=31).contains(&d)) {
                    return Err(ValidationError::MonthDayOutOfRange(bad));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::None => f.write_str("None"),
            Recurrence::NextWeekOnce => f.write_str("Next week once"),
            Recurrence::Weekly { days } => {
                let names: Vec<&str> = days
                    .iter()
                    .filter_map(|&d| WEEKDAY_LABELS.get(d as usize).copied())
                    .collect();
                write!(f, "Weekly ({})", names.join(", "))
            }
            Recurrence::Monthly { days } => {
                let nums: Vec<String> = days.iter().map(|d| d.to_string()).collect();
                write!(f, "Monthly ({})", nums.join(", "))
            }
            Recurrence::Yearly => f.write_str("Yearly"),
        }
    }
}

/// A reminder firing before an occurrence, or at a fixed instant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reminder {
    Minutes { value: u32 },
    Hours { value: u32 },
    Days { value: u32 },
    SpecificDate { at: NaiveDateTime },
}

impl Reminder {
    /// Instant at which this reminder fires for the given occurrence, or
    /// `None` when the offset reaches past the representable range.
    pub fn fire_at(&self, occurrence: NaiveDateTime) -> Option<NaiveDateTime> {
        let offset = match *self {
            Reminder::Minutes { value } => Duration::try_minutes(value as i64)?,
            Reminder::Hours { value } => Duration::try_hours(value as i64)?,
            Reminder::Days { value } => Duration::try_days(value as i64)?,
            Reminder::SpecificDate { at } => return Some(at),
        };
        occurrence.checked_sub_signed(offset)
    }

    pub fn is_relative(&self) -> bool {
        !matches!(self, Reminder::SpecificDate { .. })
    }
}

impl FromStr for Reminder {
    type Err = String;

    /// Accepts `10m`, `2h`, `1d` or an absolute `YYYY-MM-DD HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(at) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
            return Ok(Reminder::SpecificDate { at });
        }
        if s.len() < 2 {
            return Err(format!("Invalid reminder '{}'. Use 10m, 2h, 1d or 'YYYY-MM-DD HH:MM'.", s));
        }
        let (num, unit) = s.split_at(s.len() - 1);
        let value: u32 = num
            .parse()
            .map_err(|_| format!("Invalid reminder '{}'. Use 10m, 2h, 1d or 'YYYY-MM-DD HH:MM'.", s))?;
        match unit {
            "m" => Ok(Reminder::Minutes { value }),
            "h" => Ok(Reminder::Hours { value }),
            "d" => Ok(Reminder::Days { value }),
            _ => Err(format!("Invalid reminder unit in '{}'. Use m, h or d.", s)),
        }
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reminder::Minutes { value } => write!(f, "{}m before", value),
            Reminder::Hours { value } => write!(f, "{}h before", value),
            Reminder::Days { value } => write!(f, "{}d before", value),
            Reminder::SpecificDate { at } => write!(f, "at {}", at.format("%Y-%m-%d %H:%M")),
        }
    }
}

/// Represents a single task in the reminder list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: TaskId,
    /// What needs doing.
    pub title: String,
    /// First (or only) occurrence. Repeating tasks take their time of day from it.
    pub anchor: NaiveDateTime,
    /// How the task repeats.
    #[serde(default)]
    pub recurrence: Recurrence,
    /// Optional tag the task is filed under.
    #[serde(default)]
    pub tag_id: Option<TagId>,
    /// Fire a notification at the occurrence itself.
    #[serde(default)]
    pub start_alarm: bool,
    /// Reminders fired ahead of the occurrence.
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    /// Days on which the occurrence was marked done.
    #[serde(default)]
    pub completed_days: BTreeSet<CalendarDay>,
    /// Handles of the notifications currently scheduled for this task.
    #[serde(default)]
    pub notification_ids: Vec<NotificationHandle>,
    /// When the task was created.
    pub created_at: NaiveDateTime,
}

/// A label tasks can be filed under.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Index into the tag palette.
    pub color_index: usize,
    pub created_at: NaiveDateTime,
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub anchor: NaiveDateTime,
    pub recurrence: Recurrence,
    pub tag_id: Option<TagId>,
    pub start_alarm: bool,
    pub reminders: Vec<Reminder>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, anchor: NaiveDateTime) -> Self {
        TaskDraft {
            title: title.into(),
            anchor,
            recurrence: Recurrence::None,
            tag_id: None,
            start_alarm: false,
            reminders: Vec::new(),
        }
    }

    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn tag(mut self, tag_id: TagId) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    pub fn start_alarm(mut self, enabled: bool) -> Self {
        self.start_alarm = enabled;
        self
    }

    pub fn reminder(mut self, reminder: Reminder) -> Self {
        self.reminders.push(reminder);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        self.recurrence.validate()
    }
}

/// Partial update of a task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub anchor: Option<NaiveDateTime>,
    pub recurrence: Option<Recurrence>,
    /// `Some(None)` clears the tag.
    pub tag_id: Option<Option<TagId>>,
    pub start_alarm: Option<bool>,
    pub reminders: Option<Vec<Reminder>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TaskUpdate::default()
    }

    /// Applies the update onto `task`, leaving the identity fields alone.
    pub fn apply_to(self, task: &mut Task) {
        if let Some(t) = self.title { task.title = t.trim().to_string(); }
        if let Some(a) = self.anchor { task.anchor = a; }
        if let Some(r) = self.recurrence { task.recurrence = r; }
        if let Some(t) = self.tag_id { task.tag_id = t; }
        if let Some(s) = self.start_alarm { task.start_alarm = s; }
        if let Some(r) = self.reminders { task.reminders = r; }
    }
}

/// Input for creating a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
    pub color_index: usize,
}

impl TagDraft {
    pub fn new(name: impl Into<String>, color_index: usize) -> Self {
        TagDraft { name: name.into(), color_index }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tag_fields(Some(&self.name), Some(self.color_index))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub color_index: Option<usize>,
}

impl TagUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tag_fields(self.name.as_deref(), self.color_index)
    }
}

fn validate_tag_fields(name: Option<&str>, color_index: Option<usize>) -> Result<(), ValidationError> {
    if let Some(n) = name {
        if n.trim().is_empty() {
            return Err(ValidationError::EmptyTagName);
        }
    }
    if let Some(c) = color_index {
        if c >= TAG_PALETTE_LEN {
            return Err(ValidationError::ColorOutOfRange(c));
        }
    }
    Ok(())
}

/// Parses a comma-separated weekday list: `mon,wed` or `1,3`.
pub fn parse_weekdays(s: &str) -> Result<BTreeSet<u8>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if let Ok(n) = p.parse::<u8>() {
                return Ok(n);
            }
            let lower = p.to_lowercase();
            WEEKDAY_LABELS
                .iter()
                .position(|label| lower.starts_with(&label.to_lowercase()))
                .map(|i| i as u8)
                .ok_or_else(|| format!("Unknown weekday '{}'", p))
        })
        .collect()
}

/// Parses a comma-separated list of day numbers: `1,15,31`.
pub fn parse_month_days(s: &str) -> Result<BTreeSet<u8>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u8>().map_err(|_| format!("Invalid day number '{}'", p)))
        .collect()
}
