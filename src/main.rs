mod cli;

use chrono::NaiveDate;
use clap::Parser;
use cli::{Cli, Commands, SettingsArgs, TaskArgs};
use dayplan::application::bootstrap::bootstrap_workspace;
use dayplan::application::commands::{
    create_task_impl, delete_task_impl, get_day_agenda_impl, get_settings_impl,
    get_statistics_impl, get_task_impl, list_children_impl, list_month_impl,
    list_tasks_for_date_impl, list_week_impl, parse_date_input, parse_time_input,
    set_task_completed_impl, update_settings_impl, update_task_impl, AppState,
};
use dayplan::application::derived_state::spawn_refresh_ticker;
use dayplan::domain::models::{Settings, TaskDraft, TaskKind};
use dayplan::infrastructure::error::InfraError;
use dayplan::infrastructure::logging::init_logging;
use dayplan::infrastructure::task_repository::{parse_kind, parse_priority, parse_recurrence};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let workspace_root = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };
    let layout = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    let _log_guard = init_logging(&layout.logs_dir).map_err(|error| error.to_string())?;
    let state = AppState::open(&layout).map_err(|error| error.to_string())?;

    match cli.command {
        Commands::Add(args) => {
            let draft = draft_from_args(&state, args)
                .map_err(|error| state.command_error("create_task", &error))?;
            print_json(
                &create_task_impl(&state, draft)
                    .map_err(|error| state.command_error("create_task", &error))?,
            )
        }
        Commands::Edit { id, task } => {
            let draft = draft_from_args(&state, task)
                .map_err(|error| state.command_error("update_task", &error))?;
            print_json(
                &update_task_impl(&state, id, draft)
                    .map_err(|error| state.command_error("update_task", &error))?,
            )
        }
        Commands::Show { id } => print_json(
            &get_task_impl(&state, id)
                .map_err(|error| state.command_error("get_task", &error))?,
        ),
        Commands::List { date } => {
            let date = resolve_date(&state, date.as_deref())
                .map_err(|error| state.command_error("list_tasks", &error))?;
            print_json(
                &list_tasks_for_date_impl(&state, date)
                    .map_err(|error| state.command_error("list_tasks", &error))?,
            )
        }
        Commands::Week { date } => {
            let date = resolve_date(&state, date.as_deref())
                .map_err(|error| state.command_error("list_week", &error))?;
            print_json(
                &list_week_impl(&state, date)
                    .map_err(|error| state.command_error("list_week", &error))?,
            )
        }
        Commands::Month { date } => {
            let date = resolve_date(&state, date.as_deref())
                .map_err(|error| state.command_error("list_month", &error))?;
            print_json(
                &list_month_impl(&state, date)
                    .map_err(|error| state.command_error("list_month", &error))?,
            )
        }
        Commands::Agenda { date } => {
            let date = date
                .as_deref()
                .map(|value| parse_date_input(value, "date"))
                .transpose()
                .map_err(|error| state.command_error("get_day_agenda", &error))?;
            print_json(
                &get_day_agenda_impl(&state, date)
                    .map_err(|error| state.command_error("get_day_agenda", &error))?,
            )
        }
        Commands::Children { id } => print_json(
            &list_children_impl(&state, id)
                .map_err(|error| state.command_error("list_children", &error))?,
        ),
        Commands::Complete { id } => print_json(
            &set_task_completed_impl(&state, id, true)
                .map_err(|error| state.command_error("set_task_completed", &error))?,
        ),
        Commands::Reopen { id } => print_json(
            &set_task_completed_impl(&state, id, false)
                .map_err(|error| state.command_error("set_task_completed", &error))?,
        ),
        Commands::Delete { id, cascade } => print_json(
            &delete_task_impl(&state, id, cascade)
                .map_err(|error| state.command_error("delete_task", &error))?,
        ),
        Commands::Stats => print_json(
            &get_statistics_impl(&state)
                .map_err(|error| state.command_error("get_statistics", &error))?,
        ),
        Commands::Settings(args) => {
            let settings = if args.is_empty() {
                get_settings_impl(&state)
            } else {
                apply_settings_args(&state, args)
            }
            .map_err(|error| state.command_error("update_settings", &error))?;
            print_json(&settings)
        }
        Commands::Watch { period_secs, count } => watch(state, period_secs, count).await,
    }
}

async fn watch(state: AppState, period_secs: u64, count: Option<u32>) -> Result<(), String> {
    let state = Arc::new(state);
    let mut receiver = state.subscribe();
    let ticker = spawn_refresh_ticker(state.clone(), Duration::from_secs(period_secs.max(1)));

    let mut printed = 0u32;
    while count.is_none_or(|limit| printed < limit) {
        if receiver.changed().await.is_err() {
            break;
        }
        let derived = receiver.borrow_and_update().clone();
        if let Some(derived) = derived {
            print_json(derived.as_ref())?;
            printed += 1;
        }
    }

    ticker.shutdown().await;
    Ok(())
}

fn draft_from_args(state: &AppState, args: TaskArgs) -> Result<TaskDraft, InfraError> {
    let date = resolve_date(state, args.date.as_deref())?;
    let start = args
        .start
        .as_deref()
        .map(|value| parse_time_input(value, "start"))
        .transpose()?;
    let end = args
        .end
        .as_deref()
        .map(|value| parse_time_input(value, "end"))
        .transpose()?;
    let kind = match args.kind.as_deref() {
        Some(value) => parse_kind(value)
            .ok_or_else(|| InfraError::InvalidInput(format!("unknown kind: {value}")))?,
        None if end.is_some() => TaskKind::Interval,
        None => TaskKind::Point,
    };

    Ok(TaskDraft {
        parent_id: args.parent,
        start,
        end,
        kind,
        description: args.description,
        important: args.important,
        priority: parse_priority(&args.priority)
            .ok_or_else(|| InfraError::InvalidInput(format!("unknown priority: {}", args.priority)))?,
        category: args.category,
        tags: args.tags,
        recurrence: parse_recurrence(&args.recurrence).ok_or_else(|| {
            InfraError::InvalidInput(format!("unknown recurrence: {}", args.recurrence))
        })?,
        reminder_minutes: args.reminder,
        ..TaskDraft::new(args.title, date)
    })
}

fn apply_settings_args(state: &AppState, args: SettingsArgs) -> Result<Settings, InfraError> {
    let mut settings = get_settings_impl(state)?;
    if let Some(timezone) = args.timezone {
        settings.timezone = timezone;
    }
    if let Some(start) = args.working_start {
        settings.working_hours.start = start;
    }
    if let Some(end) = args.working_end {
        settings.working_hours.end = end;
    }
    if let Some(week_start) = args.week_start {
        settings.week_start = week_start;
    }
    if let Some(enabled) = args.notifications {
        settings.notifications_enabled = enabled;
    }
    if let Some(minutes) = args.default_reminder {
        settings.default_reminder_minutes = (minutes > 0).then_some(minutes);
    }
    update_settings_impl(state, settings)
}

fn resolve_date(state: &AppState, value: Option<&str>) -> Result<NaiveDate, InfraError> {
    match value {
        Some(value) => parse_date_input(value, "date"),
        None => {
            let zone = state
                .settings()?
                .time_zone()
                .map_err(InfraError::InvalidConfig)?;
            Ok(state.clock().today_in(&zone))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|error| error.to_string())?;
    println!("{rendered}");
    Ok(())
}
