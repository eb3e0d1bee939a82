//! Configuration loading
//!
//! Reads `config.toml` from the data directory. Every field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::recurrence::DueMode;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Schedule notifications for start alarms and reminders
    #[serde(default = "default_true")]
    pub notifications: bool,

    /// Number of days shown in the date strip (`week`, TUI)
    #[serde(default = "default_strip_days")]
    pub date_strip_days: usize,

    /// How tasks are matched to a browsed day
    #[serde(default)]
    pub due_mode: DueMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notifications: default_true(),
            date_strip_days: default_strip_days(),
            due_mode: DueMode::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_strip_days() -> usize {
    14
}

impl Config {
    /// Load `config.toml` from `dir`, falling back to defaults when absent
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
