use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Personal day planner. Tasks live in a SQLite file inside the workspace;
/// every command prints JSON.
#[derive(Debug, Parser)]
#[command(name = "dayplan", version, about = "Day agendas, recurring tasks and statistics")]
pub struct Cli {
    /// Workspace root holding config/, state/ and logs/.
    #[arg(long, global = true, env = "DAYPLAN_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add(TaskArgs),

    /// Replace the editable fields of an existing task.
    Edit {
        id: String,
        #[command(flatten)]
        task: TaskArgs,
    },

    /// Show a single task.
    Show { id: String },

    /// List the tasks of one day (defaults to today).
    List {
        #[arg(long)]
        date: Option<String>,
    },

    /// Tasks and per-day counts for the week containing the date.
    Week {
        #[arg(long)]
        date: Option<String>,
    },

    /// Tasks and per-day counts for the month containing the date.
    Month {
        #[arg(long)]
        date: Option<String>,
    },

    /// Day agenda with free slots inside the working hours.
    Agenda {
        #[arg(long)]
        date: Option<String>,
    },

    /// Children of a main activity and their progress.
    Children { id: String },

    /// Mark a task as done. Recurring tasks get their next occurrence.
    Complete { id: String },

    /// Mark a task as not done.
    Reopen { id: String },

    /// Delete a task. Children are detached unless --cascade is given.
    Delete {
        id: String,
        #[arg(long)]
        cascade: bool,
    },

    /// Completion statistics over all tasks.
    Stats,

    /// Show settings, or update them when any flag is given.
    Settings(SettingsArgs),

    /// Republish the derived agenda and statistics on a fixed period.
    Watch {
        /// Seconds between refreshes.
        #[arg(long, default_value_t = 60)]
        period_secs: u64,
        /// Stop after this many refreshes.
        #[arg(long)]
        count: Option<u32>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct TaskArgs {
    /// Short title for the task.
    pub title: String,
    /// Day of the task: YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    pub date: Option<String>,
    /// Start time: HH:MM.
    #[arg(long)]
    pub start: Option<String>,
    /// End time: HH:MM. Implies an interval task unless --kind says otherwise.
    #[arg(long)]
    pub end: Option<String>,
    /// Task kind: point | interval.
    #[arg(long)]
    pub kind: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub important: bool,
    /// Priority: low | medium | high.
    #[arg(long, default_value = "medium")]
    pub priority: String,
    #[arg(long)]
    pub category: Option<String>,
    /// Tag. May be repeated.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Recurrence: none | daily | weekly | monthly | yearly.
    #[arg(long, default_value = "none")]
    pub recurrence: String,
    /// Reminder lead time in minutes.
    #[arg(long)]
    pub reminder: Option<u32>,
    /// Parent main activity id.
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    /// IANA timezone name used for day boundaries.
    #[arg(long)]
    pub timezone: Option<String>,
    /// Working hours start: HH:MM.
    #[arg(long)]
    pub working_start: Option<String>,
    /// Working hours end: HH:MM.
    #[arg(long)]
    pub working_end: Option<String>,
    /// First day of the week, e.g. monday.
    #[arg(long)]
    pub week_start: Option<String>,
    #[arg(long)]
    pub notifications: Option<bool>,
    /// Default reminder lead time in minutes; 0 disables it.
    #[arg(long)]
    pub default_reminder: Option<u32>,
}

impl SettingsArgs {
    pub fn is_empty(&self) -> bool {
        self.timezone.is_none()
            && self.working_start.is_none()
            && self.working_end.is_none()
            && self.week_start.is_none()
            && self.notifications.is_none()
            && self.default_reminder.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_repeated_tags() {
        let cli = Cli::try_parse_from([
            "dayplan", "add", "Standup", "--date", "2026-02-16", "--start", "09:00", "--end",
            "09:15", "--tag", "team", "--tag", "daily",
        ])
        .expect("parse");
        match cli.command {
            Commands::Add(task) => {
                assert_eq!(task.title, "Standup");
                assert_eq!(task.tags, vec!["team".to_string(), "daily".to_string()]);
                assert_eq!(task.priority, "medium");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn settings_without_flags_is_empty() {
        let cli = Cli::try_parse_from(["dayplan", "settings"]).expect("parse");
        match cli.command {
            Commands::Settings(args) => assert!(args.is_empty()),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
