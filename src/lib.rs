//! Personal task reminders: tasks with a due time, an optional repeat
//! pattern, tags and reminders, and per-day completion tracking.

pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod limits;
pub mod models;
pub mod recurrence;
pub mod reminders;
pub mod repository;
pub mod storage;
pub mod tui;

pub use error::{Error, Result};
pub use repository::{Repository, RepositoryOptions};
