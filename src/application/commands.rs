use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::application::derived_state::{DerivedState, DerivedStatePublisher};
use crate::domain::agenda::{build_agenda, DayAgenda};
use crate::domain::calendar::{day_loads, month_bounds, week_bounds, DateRange, DayLoad};
use crate::domain::hierarchy::{ActivityProgress, TaskHierarchy};
use crate::domain::models::{parse_hhmm, Settings, Task, TaskDraft};
use crate::domain::recurrence::next_occurrence;
use crate::domain::reminders::reminder_fire_time;
use crate::domain::statistics::{aggregate, Statistics};
use crate::domain::validation::validate;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::config::{ensure_default_configs, load_settings, save_settings};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::reminder_sink::{LoggingReminderSink, ReminderSink};
use crate::infrastructure::task_repository::{SqliteTaskStore, TaskStore};
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

pub struct AppState {
    config_dir: PathBuf,
    store: Arc<dyn TaskStore>,
    reminders: Arc<dyn ReminderSink>,
    clock: Clock,
    settings: Mutex<Settings>,
    write_guard: Mutex<()>,
    derived: DerivedStatePublisher,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let layout = bootstrap_workspace(&workspace_root)?;
        Self::open(&layout)
    }

    /// Opens an already bootstrapped workspace with the SQLite store, the
    /// logging reminder sink and the system clock.
    pub fn open(layout: &BootstrapResult) -> Result<Self, InfraError> {
        Self::with_components(
            layout.config_dir.clone(),
            Arc::new(SqliteTaskStore::new(&layout.database_path)),
            Arc::new(LoggingReminderSink),
            Clock::system(),
        )
    }

    pub fn with_components(
        config_dir: PathBuf,
        store: Arc<dyn TaskStore>,
        reminders: Arc<dyn ReminderSink>,
        clock: Clock,
    ) -> Result<Self, InfraError> {
        ensure_default_configs(&config_dir)?;
        let settings = load_settings(&config_dir)?;
        Ok(Self {
            config_dir,
            store,
            reminders,
            clock,
            settings: Mutex::new(settings),
            write_guard: Mutex::new(()),
            derived: DerivedStatePublisher::new(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn settings(&self) -> Result<Settings, InfraError> {
        let settings = self
            .settings
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("settings lock poisoned: {error}")))?;
        Ok(settings.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DerivedState>>> {
        self.derived.subscribe()
    }

    /// Re-derives agenda and statistics from the current store snapshot and
    /// republishes them to subscribers.
    pub fn refresh_derived_state(&self) -> Result<Arc<DerivedState>, InfraError> {
        let snapshot = self.store.list_all()?;
        let settings = self.settings()?;
        self.derived.publish(&snapshot, &settings, self.clock.now())
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        tracing::error!(command, error = %error, "command failed");
        error.to_string()
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, InfraError> {
        self.write_guard
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("write lock poisoned: {error}")))
    }

    fn publish_after_write(&self, command: &str) {
        if let Err(error) = self.refresh_derived_state() {
            tracing::warn!(command, error = %error, "failed to republish derived state");
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionResponse {
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_occurrence: Option<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_occurrence: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarViewResponse {
    pub range: DateRange,
    pub tasks: Vec<Task>,
    pub loads: Vec<DayLoad>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChildrenResponse {
    pub parent: Task,
    pub progress: ActivityProgress,
    pub children: Vec<Task>,
}

pub fn create_task_impl(state: &AppState, draft: TaskDraft) -> Result<Task, InfraError> {
    let mut draft = normalize_draft(draft)?;

    let task = {
        let _guard = state.lock_writes()?;
        let settings = state.settings()?;
        if draft.start.is_some() && draft.reminder_minutes.is_none() {
            draft.reminder_minutes = settings.default_reminder_minutes;
        }
        let task = Task::new(draft, state.clock.now());
        check_task(state, &task, "create_task")?;
        state.store.upsert(&task)?;
        sync_reminder(state, &settings, &task);
        task
    };

    tracing::info!(command = "create_task", task_id = %task.id, date = %task.date, "created task");
    state.publish_after_write("create_task");
    Ok(task)
}

pub fn update_task_impl(
    state: &AppState,
    task_id: String,
    draft: TaskDraft,
) -> Result<Task, InfraError> {
    let task_id = normalize_id(&task_id, "task_id")?;
    let draft = normalize_draft(draft)?;

    let updated = {
        let _guard = state.lock_writes()?;
        let settings = state.settings()?;
        let existing = require_task(state, &task_id)?;
        let updated = existing.replaced_with(draft, state.clock.now());
        check_task(state, &updated, "update_task")?;
        state.store.upsert(&updated)?;
        sync_reminder(state, &settings, &updated);
        updated
    };

    tracing::info!(command = "update_task", task_id = %updated.id, "updated task");
    state.publish_after_write("update_task");
    Ok(updated)
}

/// Marks a task done or open again. Completing a recurring task also inserts
/// its next occurrence as a separate record. A next occurrence that cannot be
/// stored is reported in `rejected_occurrence`; the completion itself is kept.
pub fn set_task_completed_impl(
    state: &AppState,
    task_id: String,
    completed: bool,
) -> Result<CompletionResponse, InfraError> {
    let task_id = normalize_id(&task_id, "task_id")?;

    let (task, next, rejected_occurrence) = {
        let _guard = state.lock_writes()?;
        let settings = state.settings()?;
        let mut task = require_task(state, &task_id)?;
        if task.completed == completed {
            return Ok(CompletionResponse {
                task,
                next_occurrence: None,
                rejected_occurrence: None,
            });
        }

        let now = state.clock.now();
        task.completed = completed;
        task.completed_at = completed.then_some(now);
        task.updated_at = now;

        let mut rejected = None;
        let candidate = match completed.then(|| next_occurrence(&task, now)).flatten() {
            Some(candidate) => match check_task(state, &candidate, "set_task_completed") {
                Ok(()) => Some(candidate),
                Err(error @ (InfraError::Validation(_) | InfraError::InvalidInput(_))) => {
                    rejected = Some(error.to_string());
                    None
                }
                Err(error) => return Err(error),
            },
            None => None,
        };

        state.store.upsert(&task)?;
        sync_reminder(state, &settings, &task);

        let next = match candidate {
            Some(candidate) => match state.store.upsert(&candidate) {
                Ok(()) => {
                    sync_reminder(state, &settings, &candidate);
                    Some(candidate)
                }
                Err(error) => {
                    tracing::warn!(task_id = %task.id, error = %error, "failed to store next occurrence");
                    rejected = Some(error.to_string());
                    None
                }
            },
            None => None,
        };
        (task, next, rejected)
    };

    tracing::info!(
        command = "set_task_completed",
        task_id = %task.id,
        completed,
        next_occurrence = next.as_ref().map(|next| next.id.as_str()),
        "updated completion"
    );
    state.publish_after_write("set_task_completed");

    Ok(CompletionResponse {
        task,
        next_occurrence: next,
        rejected_occurrence,
    })
}

/// Deletes a task. With `cascade` its children go too; otherwise they are
/// detached and become top-level tasks. Returns the ids that were removed.
pub fn delete_task_impl(
    state: &AppState,
    task_id: String,
    cascade: bool,
) -> Result<Vec<String>, InfraError> {
    let task_id = normalize_id(&task_id, "task_id")?;

    let deleted = {
        let _guard = state.lock_writes()?;
        if state.store.get_by_id(&task_id)?.is_none() {
            return Ok(Vec::new());
        }
        if cascade {
            state.store.delete_cascade(&task_id)?
        } else {
            let now = state.clock.now();
            for mut child in state
                .store
                .list_all()?
                .into_iter()
                .filter(|task| task.parent_id.as_deref() == Some(task_id.as_str()))
            {
                child.parent_id = None;
                child.updated_at = now;
                state.store.upsert(&child)?;
            }
            if state.store.delete(&task_id)? {
                vec![task_id.clone()]
            } else {
                Vec::new()
            }
        }
    };

    for removed in &deleted {
        if let Err(error) = state.reminders.cancel(removed) {
            tracing::warn!(task_id = %removed, error = %error, "failed to cancel reminder");
        }
    }
    tracing::info!(
        command = "delete_task",
        task_id = %task_id,
        cascade,
        removed = deleted.len(),
        "deleted task"
    );
    state.publish_after_write("delete_task");
    Ok(deleted)
}

pub fn get_task_impl(state: &AppState, task_id: String) -> Result<Task, InfraError> {
    let task_id = normalize_id(&task_id, "task_id")?;
    require_task(state, &task_id)
}

pub fn list_tasks_for_date_impl(state: &AppState, date: NaiveDate) -> Result<Vec<Task>, InfraError> {
    state.store.tasks_for_date(date)
}

pub fn list_week_impl(state: &AppState, date: NaiveDate) -> Result<CalendarViewResponse, InfraError> {
    let settings = state.settings()?;
    let week_start = settings.week_start_day().map_err(InfraError::InvalidConfig)?;
    calendar_view(state, week_bounds(date, week_start))
}

pub fn list_month_impl(state: &AppState, date: NaiveDate) -> Result<CalendarViewResponse, InfraError> {
    let range = month_bounds(date)
        .ok_or_else(|| InfraError::InvalidInput(format!("month of {date} is out of range")))?;
    calendar_view(state, range)
}

pub fn get_day_agenda_impl(state: &AppState, date: Option<NaiveDate>) -> Result<DayAgenda, InfraError> {
    let settings = state.settings()?;
    let date = match date {
        Some(date) => date,
        None => state.clock.today_in(&settings_zone(&settings)?),
    };
    let (working_start, working_end) = settings
        .working_hours
        .window()
        .map_err(InfraError::InvalidConfig)?;
    let tasks = state.store.tasks_for_date(date)?;
    let agenda = build_agenda(tasks, working_start, working_end);
    tracing::debug!(
        command = "get_day_agenda",
        date = %date,
        free_minutes = agenda.free_minutes(),
        "built agenda"
    );
    Ok(agenda)
}

pub fn get_statistics_impl(state: &AppState) -> Result<Statistics, InfraError> {
    let settings = state.settings()?;
    let zone = settings_zone(&settings)?;
    let tasks = state.store.list_all()?;
    Ok(aggregate(&tasks, state.clock.today_in(&zone), &zone))
}

pub fn list_children_impl(state: &AppState, parent_id: String) -> Result<ChildrenResponse, InfraError> {
    let parent_id = normalize_id(&parent_id, "parent_id")?;
    let parent = require_task(state, &parent_id)?;
    let snapshot = state.store.list_all()?;
    let hierarchy = TaskHierarchy::from_snapshot(&snapshot);
    Ok(ChildrenResponse {
        progress: hierarchy.progress(&parent_id),
        children: hierarchy
            .children_of(&parent_id)
            .iter()
            .map(|task| (*task).clone())
            .collect(),
        parent,
    })
}

pub fn get_settings_impl(state: &AppState) -> Result<Settings, InfraError> {
    state.settings()
}

/// Persists new settings and re-plans every open reminder, since the zone or
/// the notification toggle may have changed.
pub fn update_settings_impl(state: &AppState, settings: Settings) -> Result<Settings, InfraError> {
    let replanned = {
        let _guard = state.lock_writes()?;
        save_settings(state.config_dir(), &settings)?;
        {
            let mut current = state.settings.lock().map_err(|error| {
                InfraError::InvalidConfig(format!("settings lock poisoned: {error}"))
            })?;
            *current = settings.clone();
        }

        let open_tasks = state
            .store
            .list_all()?
            .into_iter()
            .filter(|task| !task.completed)
            .collect::<Vec<_>>();
        for task in &open_tasks {
            sync_reminder(state, &settings, task);
        }
        open_tasks.len()
    };

    tracing::info!(
        command = "update_settings",
        replanned,
        "updated settings"
    );
    state.publish_after_write("update_settings");
    Ok(settings)
}

/// Runs every check a write must pass without touching the store.
fn check_task(state: &AppState, task: &Task, command: &str) -> Result<(), InfraError> {
    task.validate().map_err(InfraError::InvalidInput)?;
    if let Err(error) = ensure_valid_hierarchy(state, task) {
        tracing::warn!(command, task_id = %task.id, error = %error, "rejected task");
        return Err(error);
    }

    let same_day = state.store.tasks_for_date(task.date)?;
    if let Err(error) = validate(task, &same_day) {
        tracing::warn!(command, task_id = %task.id, error = %error, "rejected task");
        return Err(error.into());
    }
    Ok(())
}

/// Keeps the hierarchy two levels deep: parents are main activities and stay
/// main activities while they own children.
fn ensure_valid_hierarchy(state: &AppState, task: &Task) -> Result<(), InfraError> {
    let snapshot = state.store.list_all()?;
    let hierarchy = TaskHierarchy::from_snapshot(&snapshot);

    if hierarchy.has_children(&task.id) {
        if task.parent_id.is_some() {
            return Err(InfraError::InvalidInput(format!(
                "task {} has children and cannot be nested",
                task.id
            )));
        }
        if !task.is_main_activity() {
            return Err(InfraError::InvalidInput(format!(
                "task {} has children and must keep an end time",
                task.id
            )));
        }
    }

    let Some(parent_id) = task.parent_id.as_deref() else {
        return Ok(());
    };
    let parent = snapshot
        .iter()
        .find(|candidate| candidate.id == parent_id)
        .ok_or_else(|| InfraError::InvalidInput(format!("parent task not found: {parent_id}")))?;
    if !parent.is_main_activity() {
        return Err(InfraError::InvalidInput(format!(
            "parent task {parent_id} is not a main activity"
        )));
    }
    Ok(())
}

fn sync_reminder(state: &AppState, settings: &Settings, task: &Task) {
    let outcome = match settings.time_zone() {
        Ok(zone) => match reminder_fire_time(task, &zone) {
            Some(fire_at) if settings.notifications_enabled && fire_at > state.clock.now() => {
                state.reminders.schedule(task, fire_at)
            }
            _ => state.reminders.cancel(&task.id),
        },
        Err(message) => Err(InfraError::InvalidConfig(message)),
    };
    if let Err(error) = outcome {
        tracing::warn!(task_id = %task.id, error = %error, "failed to update reminder");
    }
}

fn calendar_view(state: &AppState, range: DateRange) -> Result<CalendarViewResponse, InfraError> {
    let tasks = state.store.tasks_in_range(range.first, range.last)?;
    Ok(CalendarViewResponse {
        range,
        loads: day_loads(&tasks, range),
        tasks,
    })
}

fn require_task(state: &AppState, task_id: &str) -> Result<Task, InfraError> {
    state
        .store
        .get_by_id(task_id)?
        .ok_or_else(|| InfraError::TaskNotFound(task_id.to_string()))
}

fn settings_zone(settings: &Settings) -> Result<Tz, InfraError> {
    settings.time_zone().map_err(InfraError::InvalidConfig)
}

fn normalize_id(value: &str, field_name: &str) -> Result<String, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidInput(format!(
            "{field_name} must not be empty"
        )));
    }
    Ok(value.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn normalize_draft(mut draft: TaskDraft) -> Result<TaskDraft, InfraError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(InfraError::InvalidInput(
            "title must not be empty".to_string(),
        ));
    }
    draft.title = title.to_string();
    draft.description = normalize_optional(draft.description);
    draft.category = normalize_optional(draft.category);
    draft.parent_id = normalize_optional(draft.parent_id);

    let mut seen = HashSet::new();
    draft.tags = draft
        .tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_ascii_lowercase()))
        .map(ToOwned::to_owned)
        .collect();
    Ok(draft)
}

pub fn parse_date_input(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|error| InfraError::InvalidInput(format!("{field_name} must be YYYY-MM-DD: {error}")))
}

pub fn parse_time_input(value: &str, field_name: &str) -> Result<NaiveTime, InfraError> {
    parse_hhmm(value).ok_or_else(|| InfraError::InvalidInput(format!("{field_name} must be HH:MM")))
}
