//! Error types for remindust.
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad arguments, missing task or tag, invalid input)
//! - 3: Blocked by the free-tier limits
//! - 4: Operation failed (storage, corrupt data, configuration)

use std::fmt;
use thiserror::Error;

use crate::models::{TagId, TaskId};

/// Exit codes for the remindust CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const LIMIT_EXCEEDED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Features gated by the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedFeature {
    Recurrence,
    Tag,
    MonthlyDates,
}

impl fmt::Display for LimitedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitedFeature::Recurrence => "recurring tasks",
            LimitedFeature::Tag => "tags",
            LimitedFeature::MonthlyDates => "monthly day numbers",
        };
        f.write_str(s)
    }
}

/// Input rejected before it reaches the task or tag collections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Weekly tasks need at least one weekday")]
    NoWeekdays,

    #[error("Monthly tasks need at least one day number")]
    NoMonthDays,

    #[error("Weekday {0} is out of range (0 = Sunday .. 6 = Saturday)")]
    WeekdayOutOfRange(u8),

    #[error("Day number {0} is out of range (1..=31)")]
    MonthDayOutOfRange(u8),

    #[error("Tag name must not be empty")]
    EmptyTagName,

    #[error("Tag color {0} is outside the palette")]
    ColorOutOfRange(usize),
}

/// Failure reported by a blob store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Failure reported by a notification scheduler. Never fatal.
#[derive(Error, Debug)]
#[error("Notification error: {0}")]
pub struct NotifyError(pub String);

/// Main error type for remindust operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    #[error("Tag {0} not found")]
    TagNotFound(TagId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Free-tier limits (exit code 3)
    #[error("Free plan limit reached for {feature}; upgrade to premium to add more")]
    LimitExceeded { feature: LimitedFeature },

    // Operation failures (exit code 4)
    #[error("Failed to save: {0}")]
    Persistence(#[from] StoreError),

    #[error("Stored value '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::TaskNotFound(_)
            | Error::TagNotFound(_)
            | Error::Validation(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::LimitExceeded { .. } => exit_codes::LIMIT_EXCEEDED,

            Error::Persistence(_)
            | Error::Corrupt { .. }
            | Error::Notify(_)
            | Error::Json(_)
            | Error::Config(_)
            | Error::Io(_) => exit_codes::OPERATION_FAILED,
        }
    }

    pub fn limit(feature: LimitedFeature) -> Self {
        Error::LimitExceeded { feature }
    }
}

/// Result type alias for remindust operations
pub type Result<T> = std::result::Result<T, Error>;
