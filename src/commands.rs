use std::io::{self, Write};
use std::path::Path;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::calendar::{date_range, next_week_day, round_to_nearest_five_minutes, CalendarDay, WEEKDAY_LABELS};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ledger;
use crate::models::{
    parse_month_days, parse_weekdays, Recurrence, RecurrenceKind, Reminder, Tag, TagDraft, TagId, TagUpdate, Task,
    TaskDraft, TaskId, TaskUpdate, TAG_PALETTE,
};
use crate::recurrence::{next_occurrence, occurrence_on};
use crate::reminders::{Notifier, OutboxNotifier};
use crate::repository::{Repository, RepositoryOptions};
use crate::storage::{BlobStore, FileBlobStore};

/// The repository the CLI and TUI run against.
pub type LocalRepository = Repository<FileBlobStore, OutboxNotifier>;

/// Opens the file-backed repository rooted at `dir`.
pub fn open_local(dir: &Path) -> Result<(LocalRepository, Config)> {
    let config = Config::load(dir)?;
    let store = FileBlobStore::open(dir)?;
    let notifier = OutboxNotifier::new(dir);
    let repo = Repository::open(store, notifier, RepositoryOptions::from_config(&config))?;
    Ok((repo, config))
}

/// Maps a tag palette index to a terminal color.
pub fn tag_color(index: usize) -> Color {
    match TAG_PALETTE.get(index) {
        Some(&(r, g, b)) => Color::Rgb { r, g, b },
        None => Color::Reset,
    }
}

/// Parses `today`, `tomorrow`, `yesterday` or `YYYY-MM-DD`.
pub fn parse_day(s: &str, today: NaiveDate) -> Result<CalendarDay> {
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(today.into()),
        "tomorrow" => Ok((today + Duration::days(1)).into()),
        "yesterday" => Ok((today - Duration::days(1)).into()),
        other => other
            .parse::<CalendarDay>()
            .map_err(|e| Error::InvalidArgument(format!("Invalid date '{}': {}. Use YYYY-MM-DD.", s, e))),
    }
}

/// Parses `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD` (09:00) or `HH:MM` (on `today`).
pub fn parse_at(s: &str, today: NaiveDate) -> Result<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(at);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(at) = date.and_hms_opt(9, 0, 0) {
            return Ok(at);
        }
    }
    if let Ok(time) = NaiveTime::parse_from_str(s, "%H:%M") {
        return Ok(today.and_time(time));
    }
    Err(Error::InvalidArgument(format!(
        "Invalid date/time '{}'. Use 'YYYY-MM-DD HH:MM' or HH:MM.",
        s
    )))
}

/// Builds a recurrence rule from CLI input. Weekly and monthly rules
/// default to the anchor's weekday / day number when no days are given.
pub fn build_recurrence(kind: RecurrenceKind, days: Option<&str>, anchor: NaiveDateTime) -> Result<Recurrence> {
    let anchor_day = CalendarDay::of(anchor);
    let recurrence = match kind {
        RecurrenceKind::None => Recurrence::None,
        RecurrenceKind::NextWeekOnce => Recurrence::NextWeekOnce,
        RecurrenceKind::Yearly => Recurrence::Yearly,
        RecurrenceKind::Weekly => match days {
            Some(d) => Recurrence::Weekly { days: parse_weekdays(d).map_err(Error::InvalidArgument)? },
            None => Recurrence::weekly([anchor_day.weekday_index()]),
        },
        RecurrenceKind::Monthly => match days {
            Some(d) => Recurrence::Monthly { days: parse_month_days(d).map_err(Error::InvalidArgument)? },
            None => Recurrence::monthly([anchor_day.day() as u8]),
        },
    };
    Ok(recurrence)
}

fn parse_reminders(remind: &[String]) -> Result<Vec<Reminder>> {
    remind
        .iter()
        .map(|r| r.parse::<Reminder>().map_err(Error::InvalidArgument))
        .collect()
}

fn parse_kind(repeat: &str) -> Result<RecurrenceKind> {
    repeat.parse::<RecurrenceKind>().map_err(Error::InvalidArgument)
}

/// Accepts a tag id or a tag name.
fn resolve_tag<S: BlobStore, N: Notifier>(repo: &Repository<S, N>, tag: &str) -> Result<TagId> {
    if let Ok(id) = tag.trim().parse::<TagId>() {
        if repo.tag(id).is_some() {
            return Ok(id);
        }
        return Err(Error::TagNotFound(id));
    }
    repo.tag_by_name(tag)
        .map(|t| t.id)
        .ok_or_else(|| Error::InvalidArgument(format!("Tag '{}' not found.", tag)))
}

fn tag_cell(tag: Option<&Tag>) -> Cell {
    match tag {
        Some(t) => Cell::new(&t.name).fg(tag_color(t.color_index)),
        None => Cell::new(""),
    }
}

fn bold(s: &str) -> Cell {
    Cell::new(s).add_attribute(Attribute::Bold)
}

/// Adds a new task.
///
/// Without `at` the task is anchored at the current time rounded to five
/// minutes. A `next-week` task with `days` lands on that weekday next week.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add<S: BlobStore, N: Notifier>(
    repo: &mut Repository<S, N>,
    title: String,
    at: Option<String>,
    repeat: String,
    days: Option<String>,
    tag: Option<String>,
    start_alarm: bool,
    remind: Vec<String>,
    silent: bool,
) -> Result<TaskId> {
    let now = repo.now();
    let today = now.date();
    let kind = parse_kind(&repeat)?;

    let mut anchor = match &at {
        Some(s) => parse_at(s, today)?,
        None => round_to_nearest_five_minutes(now),
    };
    if kind == RecurrenceKind::NextWeekOnce {
        if let Some(d) = &days {
            let weekdays = parse_weekdays(d).map_err(Error::InvalidArgument)?;
            let weekday = match weekdays.iter().copied().collect::<Vec<u8>>()[..] {
                [w] if w <= 6 => w,
                [w] => return Err(Error::InvalidArgument(format!("Weekday {} is out of range (0-6)", w))),
                _ => return Err(Error::InvalidArgument("next-week needs exactly one weekday".to_string())),
            };
            anchor = next_week_day(today, weekday).and_time(anchor.time());
        }
    }

    let recurrence = build_recurrence(kind, days.as_deref(), anchor)?;
    let mut draft = TaskDraft::new(title, anchor).recurrence(recurrence).start_alarm(start_alarm);
    draft.reminders = parse_reminders(&remind)?;
    if let Some(t) = &tag {
        draft.tag_id = Some(resolve_tag(repo, t)?);
    }
    draft.validate()?;

    let task = repo.add_task(draft)?;
    if !silent {
        println!("Task added (id = {})", task.id);
        match next_occurrence(task, now) {
            Some(next) => println!("Next due {}", next.format("%a %Y-%m-%d %H:%M")),
            None => println!("This one-off occurrence has already passed."),
        }
    }
    Ok(task.id)
}

/// Lists the tasks due on a day, pending first, then completed.
pub fn cmd_list<S: BlobStore, N: Notifier>(repo: &Repository<S, N>, date: Option<String>) -> Result<()> {
    let today = repo.now().date();
    let day = match date {
        Some(d) => parse_day(&d, today)?,
        None => today.into(),
    };
    let agenda = repo.agenda(day);
    let title = format!("{} ({})", day, WEEKDAY_LABELS[day.weekday_index() as usize]);
    if agenda.is_empty() {
        println!("{}: nothing due.", title);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![bold("ID"), bold("Time"), bold("Title"), bold("Tag"), bold("Repeat"), bold("Status")]);

    for (t, done) in agenda
        .pending
        .iter()
        .map(|t| (*t, false))
        .chain(agenda.completed.iter().map(|t| (*t, true)))
    {
        let status = if done { "Done" } else { "Pending" };
        let status_color = if done { Color::Green } else { Color::Yellow };
        let title_cell = if done {
            Cell::new(&t.title).add_attribute(Attribute::CrossedOut).fg(Color::Grey)
        } else {
            Cell::new(&t.title)
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.anchor.format("%H:%M")),
            title_cell,
            tag_cell(repo.tag_of(t)),
            Cell::new(t.recurrence.to_string()),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{}: {} pending, {} done", title, agenda.pending.len(), agenda.completed.len());
    println!("{table}");
    Ok(())
}

/// Lists every task with its next occurrence.
pub fn cmd_all<S: BlobStore, N: Notifier>(repo: &Repository<S, N>) -> Result<()> {
    if repo.tasks().is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    let now = repo.now();
    let mut tasks: Vec<(&Task, Option<NaiveDateTime>)> =
        repo.tasks().iter().map(|t| (t, next_occurrence(t, now))).collect();
    // Lapsed tasks last
    tasks.sort_by_key(|(t, next)| (next.is_none(), *next, t.id));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![bold("ID"), bold("Title"), bold("Tag"), bold("Repeat"), bold("Next"), bold("Alarms")]);

    for (t, next) in tasks {
        let next_cell = match next {
            Some(n) if n < now => Cell::new(n.format("%Y-%m-%d %H:%M")).fg(Color::Red),
            Some(n) => Cell::new(n.format("%a %Y-%m-%d %H:%M")),
            None => Cell::new("lapsed").fg(Color::Grey),
        };
        let alarms = t.reminders.len() + usize::from(t.start_alarm);
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            tag_cell(repo.tag_of(t)),
            Cell::new(t.recurrence.to_string()),
            next_cell,
            Cell::new(alarms),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Prints the details of one task.
pub fn cmd_show<S: BlobStore, N: Notifier>(repo: &Repository<S, N>, id: TaskId) -> Result<()> {
    let task = repo.task(id).ok_or(Error::TaskNotFound(id))?;
    let next = repo.next_occurrence_of(task);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec![bold("Title"), Cell::new(&task.title)]);
    table.add_row(vec![bold("Tag"), tag_cell(repo.tag_of(task))]);
    table.add_row(vec![bold("When"), Cell::new(task.anchor.format("%a %Y-%m-%d %H:%M"))]);
    table.add_row(vec![bold("Repeat"), Cell::new(task.recurrence.to_string())]);
    table.add_row(vec![
        bold("Next"),
        Cell::new(next.map(|n| n.format("%a %Y-%m-%d %H:%M").to_string()).unwrap_or_else(|| "-".into())),
    ]);
    let done = next.is_some_and(|n| ledger::is_completed(task, CalendarDay::of(n)));
    table.add_row(vec![bold("Done"), Cell::new(if done { "yes" } else { "no" })]);
    table.add_row(vec![bold("Start alarm"), Cell::new(if task.start_alarm { "on" } else { "off" })]);
    let reminders: Vec<String> = task.reminders.iter().map(|r| r.to_string()).collect();
    table.add_row(vec![bold("Reminders"), Cell::new(reminders.join(", "))]);
    table.add_row(vec![bold("Completed days"), Cell::new(task.completed_days.len())]);
    table.add_row(vec![bold("Created"), Cell::new(task.created_at.format("%Y-%m-%d %H:%M"))]);
    println!("{table}");
    Ok(())
}

/// Toggles completion of a task for a day.
///
/// Without `date`, today is used when the task is due today (even if its
/// time has passed), else the day of its next occurrence, else today.
pub fn cmd_complete<S: BlobStore, N: Notifier>(
    repo: &mut Repository<S, N>,
    id: TaskId,
    date: Option<String>,
    silent: bool,
) -> Result<bool> {
    let today = repo.now().date();
    let day = match date {
        Some(d) => parse_day(&d, today)?,
        None => {
            let task = repo.task(id).ok_or(Error::TaskNotFound(id))?;
            if occurrence_on(task, today.into()).is_some() {
                today.into()
            } else {
                repo.next_occurrence_of(task).map(CalendarDay::of).unwrap_or_else(|| today.into())
            }
        }
    };
    let done = repo.toggle_task_complete(id, day)?;
    if !silent {
        if done {
            println!("Task {} marked as complete for {}.", id, day);
        } else {
            println!("Task {} marked as not done for {}.", id, day);
        }
    }
    Ok(done)
}

/// Removes a task by ID.
pub fn cmd_remove<S: BlobStore, N: Notifier>(repo: &mut Repository<S, N>, id: TaskId, silent: bool) -> Result<()> {
    repo.delete_task(id)?;
    if !silent { println!("Task {} removed.", id); }
    Ok(())
}

/// Fields of `edit`; `None` leaves a field as is.
#[derive(Debug, Default, Clone)]
pub struct EditArgs {
    pub title: Option<String>,
    pub at: Option<String>,
    pub repeat: Option<String>,
    pub days: Option<String>,
    pub tag: Option<String>,
    pub clear_tag: bool,
    pub start_alarm: Option<bool>,
    pub remind: Option<Vec<String>>,
}

/// Edits an existing task's details.
pub fn cmd_edit<S: BlobStore, N: Notifier>(
    repo: &mut Repository<S, N>,
    id: TaskId,
    args: EditArgs,
    silent: bool,
) -> Result<()> {
    let today = repo.now().date();
    let current = repo.task(id).ok_or(Error::TaskNotFound(id))?.clone();

    let mut update = TaskUpdate::default();
    if let Some(t) = args.title { update.title = Some(t); }
    if let Some(a) = &args.at { update.anchor = Some(parse_at(a, today)?); }
    let anchor = update.anchor.unwrap_or(current.anchor);

    match (&args.repeat, &args.days) {
        (Some(r), days) => {
            update.recurrence = Some(build_recurrence(parse_kind(r)?, days.as_deref(), anchor)?);
        }
        (None, Some(d)) => {
            // New day selection for the current pattern
            update.recurrence = Some(build_recurrence(current.recurrence.kind(), Some(d), anchor)?);
        }
        (None, None) => {}
    }
    if args.clear_tag {
        update.tag_id = Some(None);
    } else if let Some(t) = &args.tag {
        update.tag_id = Some(Some(resolve_tag(repo, t)?));
    }
    if let Some(s) = args.start_alarm { update.start_alarm = Some(s); }
    if let Some(r) = &args.remind { update.reminders = Some(parse_reminders(r)?); }

    if update.is_empty() {
        if !silent { println!("Nothing to change."); }
        return Ok(());
    }
    if let Some(r) = &update.recurrence {
        r.validate()?;
    }
    repo.update_task(id, update)?;
    if !silent { println!("Task {} updated.", id); }
    Ok(())
}

/// Shows a strip of days with how many tasks are due and done on each.
pub fn cmd_week<S: BlobStore, N: Notifier>(repo: &Repository<S, N>, from: Option<String>, days: usize) -> Result<()> {
    let today = repo.now().date();
    let start = match from {
        Some(d) => parse_day(&d, today)?.date(),
        None => today,
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![bold("Day"), bold("Date"), bold("Due"), bold("Done")]);
    for date in date_range(start, days) {
        let agenda = repo.agenda(date.into());
        let day_cell = Cell::new(WEEKDAY_LABELS[CalendarDay::from(date).weekday_index() as usize]);
        let date_cell = if date == today {
            Cell::new(date).add_attribute(Attribute::Bold).fg(Color::Cyan)
        } else {
            Cell::new(date)
        };
        table.add_row(vec![day_cell, date_cell, Cell::new(agenda.len()), Cell::new(agenda.completed.len())]);
    }
    println!("{table}");
    Ok(())
}

/// Adds a new tag.
pub fn cmd_tag_add<S: BlobStore, N: Notifier>(
    repo: &mut Repository<S, N>,
    name: String,
    color: usize,
    silent: bool,
) -> Result<TagId> {
    if repo.tag_by_name(&name).is_some() {
        return Err(Error::InvalidArgument(format!("Tag '{}' already exists.", name.trim())));
    }
    let tag = repo.add_tag(TagDraft::new(name, color))?;
    if !silent { println!("Tag '{}' added (id = {}).", tag.name, tag.id); }
    Ok(tag.id)
}

/// Lists all tags with how many tasks use each.
pub fn cmd_tag_list<S: BlobStore, N: Notifier>(repo: &Repository<S, N>) -> Result<()> {
    if repo.tags().is_empty() {
        println!("No tags found.");
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["ID", "Name", "Color", "Tasks"]);
    for t in repo.tags() {
        let used = repo.tasks().iter().filter(|task| task.tag_id == Some(t.id)).count();
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.name).fg(tag_color(t.color_index)),
            Cell::new(t.color_index),
            Cell::new(used),
        ]);
    }
    let limit = repo.limits().max_tags.map(|l| format!("/{}", l)).unwrap_or_default();
    println!("Tags {}{}", repo.tags().len(), limit);
    println!("{table}");
    Ok(())
}

pub fn cmd_tag_edit<S: BlobStore, N: Notifier>(
    repo: &mut Repository<S, N>,
    tag: String,
    name: Option<String>,
    color: Option<usize>,
    silent: bool,
) -> Result<()> {
    let id = resolve_tag(repo, &tag)?;
    repo.update_tag(id, TagUpdate { name, color_index: color })?;
    if !silent { println!("Tag {} updated.", id); }
    Ok(())
}

/// Removes a tag and clears it from the tasks that used it.
pub fn cmd_tag_remove<S: BlobStore, N: Notifier>(repo: &mut Repository<S, N>, tag: String, silent: bool) -> Result<()> {
    let id = resolve_tag(repo, &tag)?;
    repo.delete_tag(id)?;
    if !silent { println!("Tag {} removed.", id); }
    Ok(())
}

/// Shows the plan with counts against its limits, optionally upgrading.
pub fn cmd_premium<S: BlobStore, N: Notifier>(repo: &mut Repository<S, N>, upgrade: bool, silent: bool) -> Result<()> {
    if upgrade && !repo.is_premium() {
        repo.upgrade_to_premium()?;
        if !silent { println!("Upgraded to premium. All limits lifted."); }
    }
    if silent {
        return Ok(());
    }

    let stats = repo.stats();
    let of = |limit: Option<usize>| limit.map(|l| format!("/{}", l)).unwrap_or_default();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec![bold("Plan"), Cell::new(if stats.is_premium { "Premium" } else { "Free" })]);
    table.add_row(vec![bold("Tasks"), Cell::new(stats.tasks)]);
    table.add_row(vec![
        bold("Recurring tasks"),
        Cell::new(format!("{}{}", stats.recurring_tasks, of(stats.limits.max_recurring_tasks))),
    ]);
    table.add_row(vec![bold("Tags"), Cell::new(format!("{}{}", stats.tags, of(stats.limits.max_tags)))]);
    table.add_row(vec![
        bold("Monthly days per task"),
        Cell::new(stats.limits.max_monthly_days.map(|l| l.to_string()).unwrap_or_else(|| "unlimited".into())),
    ]);
    println!("{table}");
    Ok(())
}

/// Lists notifications waiting in the outbox.
pub fn cmd_reminders(notifier: &OutboxNotifier) -> Result<()> {
    let pending = notifier.pending()?;
    if pending.is_empty() {
        println!("No reminders scheduled.");
        return Ok(());
    }
    let now = Local::now().naive_local();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![bold("When"), bold("Task"), bold("Kind"), bold("Title")]);
    for e in pending {
        let when = Cell::new(e.at.format("%a %Y-%m-%d %H:%M"));
        table.add_row(vec![
            if e.at <= now { when.fg(Color::Grey) } else { when },
            Cell::new(e.payload.task_id),
            Cell::new(if e.payload.is_start_alarm { "start" } else { "reminder" }),
            Cell::new(e.payload.body),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Resets all data: tasks, tags, premium flag and scheduled reminders.
pub fn cmd_reset<S: BlobStore, N: Notifier>(repo: &mut Repository<S, N>, force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all tasks and tags? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    repo.clear_all_data()?;
    println!("All data cleared.");
    Ok(())
}
