//! # Remindust
//!
//! A terminal reminder list. Tasks have a due time, an optional repeat
//! pattern and tag, and optional reminders. Completion is tracked per day,
//! so a repeating task can be ticked off on Monday and still be pending on
//! Wednesday.
//!
//! ## Features
//!
//! *   **Repeat patterns**: none, next week once, weekly (several weekdays),
//!     monthly (several day numbers), yearly.
//! *   **Day agenda**: see what is due on any day, pending first.
//! *   **Tags**: file tasks under colored tags.
//! *   **Reminders**: a start alarm plus reminders minutes, hours or days
//!     ahead (or at a fixed time). Scheduled reminders land in an outbox.
//! *   **Free and premium plans**: the free plan allows one recurring task,
//!     three tags and one day number per monthly task.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! remindust
//! # or explicitly
//! remindust ui
//! ```
//!
//! **Keys**
//! *   `←`/`→`: Previous / next day
//! *   `↑`/`↓`: Select task
//! *   `Space`: Toggle done for the selected day
//! *   `a`: Add task on the selected day
//! *   `d`: Delete selected task
//! *   `q`: Quit
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! # One-off task
//! remindust add "Dentist" --at "2025-03-04 14:30" --remind 1h --remind 1d
//!
//! # Every Monday and Wednesday at 09:00
//! remindust add "Standup" --at 09:00 --repeat weekly --days mon,wed --start-alarm
//!
//! # What is due today / on a date
//! remindust list
//! remindust list --date 2025-03-04
//!
//! # Tick off today's occurrence
//! remindust complete 2 --date today
//! ```
//!
//! ## Data Storage
//!
//! Data lives in your local data directory (`~/.local/share/remindust` on
//! Linux). Override it with the `REMINDUST_DIR` environment variable. An
//! optional `config.toml` in the same directory sets `notifications`,
//! `date_strip_days` and `due_mode`.
//!
//! Logging is opt-in via `RUST_LOG`.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use remindust::commands::*;
use remindust::error::Result;
use remindust::storage::data_dir;
use remindust::tui::run_tui;

#[derive(Parser)]
#[command(name = "remindust")]
#[command(about = "Terminal task reminders with repeat patterns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// When: "YYYY-MM-DD HH:MM", YYYY-MM-DD or HH:MM (defaults to now)
        #[arg(short, long)]
        at: Option<String>,
        /// Repeat pattern (none, next-week, weekly, monthly, yearly)
        #[arg(short, long, default_value = "none")]
        repeat: String,
        /// Weekdays (mon,wed or 1,3) or day numbers (1,15) for the repeat
        #[arg(short, long)]
        days: Option<String>,
        /// Tag id or name
        #[arg(short, long)]
        tag: Option<String>,
        /// Notify at the due time
        #[arg(short, long)]
        start_alarm: bool,
        /// Reminder ahead of time: 10m, 2h, 1d or "YYYY-MM-DD HH:MM" (repeatable)
        #[arg(short = 'R', long)]
        remind: Vec<String>,
    },
    /// List tasks due on a day
    List {
        /// Day to show (YYYY-MM-DD, today, tomorrow); defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// List every task with its next occurrence
    All,
    /// Show a task's details
    Show {
        id: u64,
    },
    /// Toggle a task's completion for a day
    Complete {
        id: u64,
        /// Day to toggle; defaults to the task's next occurrence
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Remove a task
    Remove {
        id: u64,
    },
    /// Edit a task
    Edit {
        id: u64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New date/time
        #[arg(short, long)]
        at: Option<String>,
        /// New repeat pattern
        #[arg(short, long)]
        repeat: Option<String>,
        /// New weekdays or day numbers
        #[arg(short, long)]
        days: Option<String>,
        /// New tag id or name
        #[arg(short, long)]
        tag: Option<String>,
        /// Remove the tag
        #[arg(long, conflicts_with = "tag")]
        no_tag: bool,
        /// Turn the start alarm on or off
        #[arg(short, long)]
        start_alarm: Option<bool>,
        /// Replace the reminders (repeatable)
        #[arg(short = 'R', long)]
        remind: Option<Vec<String>>,
    },
    /// Show due and done counts for upcoming days
    Week {
        /// First day of the strip; defaults to today
        #[arg(short, long)]
        from: Option<String>,
        /// Number of days; defaults to `date_strip_days` from config
        #[arg(short, long)]
        days: Option<usize>,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Show the current plan and its limits
    Premium {
        /// Upgrade to premium
        #[arg(long)]
        upgrade: bool,
    },
    /// List scheduled reminders
    Reminders,
    /// Reset the database (delete all tasks, tags and reminders)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum TagCommands {
    /// Add a new tag
    Add {
        /// Tag name
        name: String,
        /// Palette color (0-7)
        #[arg(short, long, default_value_t = 0)]
        color: usize,
    },
    /// List tags
    List,
    /// Remove a tag (tasks keep existing, untagged)
    Remove {
        /// Tag id or name
        tag: String,
    },
    /// Edit a tag
    Edit {
        /// Tag id or name
        tag: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New palette color
        #[arg(short, long)]
        color: Option<usize>,
    },
}

fn init_tracing() {
    // Tracing is opt-in via RUST_LOG and goes to stderr.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(command: Option<Commands>) -> Result<()> {
    if let Some(Commands::Completions { shell }) = &command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return Ok(());
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "remindust", &mut io::stdout());
        return Ok(());
    }

    let dir = data_dir();
    let (mut repo, config) = open_local(&dir)?;

    match command {
        Some(Commands::Add { title, at, repeat, days, tag, start_alarm, remind }) => {
            cmd_add(&mut repo, title, at, repeat, days, tag, start_alarm, remind, false).map(|_| ())
        }
        Some(Commands::List { date }) => cmd_list(&repo, date),
        Some(Commands::All) => cmd_all(&repo),
        Some(Commands::Show { id }) => cmd_show(&repo, id),
        Some(Commands::Complete { id, date }) => cmd_complete(&mut repo, id, date, false).map(|_| ()),
        Some(Commands::Remove { id }) => cmd_remove(&mut repo, id, false),
        Some(Commands::Edit { id, title, at, repeat, days, tag, no_tag, start_alarm, remind }) => {
            let args = EditArgs { title, at, repeat, days, tag, clear_tag: no_tag, start_alarm, remind };
            cmd_edit(&mut repo, id, args, false)
        }
        Some(Commands::Week { from, days }) => cmd_week(&repo, from, days.unwrap_or(config.date_strip_days)),
        Some(Commands::Tag { command }) => match command {
            TagCommands::Add { name, color } => cmd_tag_add(&mut repo, name, color, false).map(|_| ()),
            TagCommands::List => cmd_tag_list(&repo),
            TagCommands::Remove { tag } => cmd_tag_remove(&mut repo, tag, false),
            TagCommands::Edit { tag, name, color } => cmd_tag_edit(&mut repo, tag, name, color, false),
        },
        Some(Commands::Premium { upgrade }) => cmd_premium(&mut repo, upgrade, false),
        Some(Commands::Reminders) => cmd_reminders(repo.notifier()),
        Some(Commands::Reset { force }) => cmd_reset(&mut repo, force),
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => run_tui(&mut repo, config.date_strip_days),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }
}
