use chrono::{NaiveDate, NaiveTime};
use ratatui::widgets::TableState;

use crate::calendar::{date_range, CalendarDay};
use crate::commands::build_recurrence;
use crate::error::Error;
use crate::models::{RecurrenceKind, Tag, Task, TaskDraft};
use crate::reminders::Notifier;
use crate::repository::Repository;
use crate::storage::BlobStore;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Adding,
}

/// One line of the day agenda.
pub struct AgendaRow {
    pub task: Task,
    pub tag: Option<Tag>,
    pub done: bool,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub time: Option<NaiveTime>,
    pub step: usize, // 0: Title, 1: Time, 2: Repeat
}

pub struct App<'a, S: BlobStore, N: Notifier> {
    pub repo: &'a mut Repository<S, N>,
    pub dates: Vec<NaiveDate>,
    pub selected_date: usize,
    pub rows: Vec<AgendaRow>,
    pub state: TableState,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub add_state: AddState,
    /// Last error or confirmation, shown in the help bar.
    pub message: Option<String>,
}

impl<'a, S: BlobStore, N: Notifier> App<'a, S, N> {
    /// Creates the app with a strip of `strip_days` days starting today.
    pub fn new(repo: &'a mut Repository<S, N>, strip_days: usize) -> Self {
        let today = repo.now().date();
        let mut app = App {
            repo,
            dates: date_range(today, strip_days.max(1)),
            selected_date: 0,
            rows: Vec::new(),
            state: TableState::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            add_state: AddState::default(),
            message: None,
        };
        app.reload();
        app
    }

    pub fn selected_day(&self) -> CalendarDay {
        self.dates[self.selected_date].into()
    }

    /// Rebuilds the agenda rows for the selected day.
    pub fn reload(&mut self) {
        let day = self.selected_day();
        let agenda = self.repo.agenda(day);
        self.rows = agenda
            .pending
            .iter()
            .map(|t| (*t, false))
            .chain(agenda.completed.iter().map(|t| (*t, true)))
            .map(|(t, done)| AgendaRow {
                task: t.clone(),
                tag: self.repo.tag_of(t).cloned(),
                done,
            })
            .collect();

        if self.rows.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= self.rows.len() {
                self.state.select(Some(self.rows.len() - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn next_day(&mut self) {
        if self.selected_date + 1 < self.dates.len() {
            self.selected_date += 1;
            self.state.select(None);
            self.reload();
        }
    }

    pub fn previous_day(&mut self) {
        if self.selected_date > 0 {
            self.selected_date -= 1;
            self.state.select(None);
            self.reload();
        }
    }

    /// Selects the next task in the agenda.
    pub fn next(&mut self) {
        if self.rows.is_empty() { return; }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous task in the agenda.
    pub fn previous(&mut self) {
        if self.rows.is_empty() { return; }
        let i = match self.state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn selected_task_id(&self) -> Option<u64> {
        self.state.selected().and_then(|i| self.rows.get(i)).map(|r| r.task.id)
    }

    /// Toggles completion of the selected task on the selected day.
    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_task_id() {
            let day = self.selected_day();
            self.message = match self.repo.toggle_task_complete(id, day) {
                Ok(true) => Some(format!("Task {} done for {}", id, day)),
                Ok(false) => Some(format!("Task {} not done for {}", id, day)),
                Err(e) => Some(e.to_string()),
            };
            self.reload();
        }
    }

    /// Deletes the currently selected task.
    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_task_id() {
            self.message = match self.repo.delete_task(id) {
                Ok(()) => Some(format!("Task {} removed", id)),
                Err(e) => Some(e.to_string()),
            };
            self.reload();
        }
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
        self.message = None;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Handles input for the "Add Task" wizard.
    pub fn handle_input(&mut self) {
        match self.add_state.step {
            0 => { // Title
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.title = self.input_buffer.clone();
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 => { // Time
                if self.input_buffer.is_empty() {
                    self.add_state.time = NaiveTime::from_hms_opt(9, 0, 0);
                } else if let Ok(t) = NaiveTime::parse_from_str(self.input_buffer.trim(), "%H:%M") {
                    self.add_state.time = Some(t);
                } else {
                    self.message = Some("Use HH:MM".to_string());
                    return;
                }
                self.add_state.step += 1;
                self.input_buffer.clear();
            }
            2 => { // Repeat
                self.message = match self.finish_add() {
                    Ok(id) => Some(format!("Task added (id = {})", id)),
                    Err(e) => Some(e.to_string()),
                };
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.reload();
            }
            _ => {}
        }
    }

    fn finish_add(&mut self) -> Result<u64, Error> {
        let kind: RecurrenceKind = self.input_buffer.parse().map_err(Error::InvalidArgument)?;
        let time = self.add_state.time.unwrap_or(NaiveTime::MIN);
        let anchor = self.selected_day().date().and_time(time);
        let recurrence = build_recurrence(kind, None, anchor)?;
        let draft = TaskDraft::new(self.add_state.title.clone(), anchor).recurrence(recurrence);
        Ok(self.repo.add_task(draft)?.id)
    }
}
