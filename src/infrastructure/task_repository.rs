use crate::domain::models::{Priority, Recurrence, Task, TaskKind};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const TASK_COLUMNS: &str = "id, parent_id, date, start_time, end_time, kind, title, description,
     important, completed, completed_at, priority, category, tags, recurrence,
     recurrence_anchor, reminder_minutes, created_at, updated_at";

pub trait TaskStore: Send + Sync {
    fn get_by_id(&self, task_id: &str) -> Result<Option<Task>, InfraError>;
    fn tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, InfraError>;
    /// Tasks dated within `first..=last`.
    fn tasks_in_range(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Task>, InfraError>;
    fn list_all(&self) -> Result<Vec<Task>, InfraError>;
    fn upsert(&self, task: &Task) -> Result<(), InfraError>;
    fn delete(&self, task_id: &str) -> Result<bool, InfraError>;

    /// Deletes the children of `task_id`, then the task itself, one row at a
    /// time. Returns the ids that were actually removed.
    fn delete_cascade(&self, task_id: &str) -> Result<Vec<String>, InfraError> {
        let children = self
            .list_all()?
            .into_iter()
            .filter(|task| task.parent_id.as_deref() == Some(task_id))
            .map(|task| task.id)
            .collect::<Vec<_>>();

        let mut deleted = Vec::with_capacity(children.len() + 1);
        for child_id in children {
            if self.delete(&child_id)? {
                deleted.push(child_id);
            }
        }
        if self.delete(task_id)? {
            deleted.push(task_id.to_string());
        }
        Ok(deleted)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
}

impl SqliteTaskStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn query_tasks(
        &self,
        where_clause: &str,
        parameters: impl rusqlite::Params,
    ) -> Result<Vec<Task>, InfraError> {
        let connection = self.connect()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks {where_clause}
             ORDER BY date, start_time, title, id"
        );
        let mut statement = connection.prepare(&sql)?;
        let rows = statement
            .query_map(parameters, TaskRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }
}

impl TaskStore for SqliteTaskStore {
    fn get_by_id(&self, task_id: &str) -> Result<Option<Task>, InfraError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![task_id],
                TaskRow::read,
            )
            .optional()?;
        row.map(TaskRow::into_task).transpose()
    }

    fn tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, InfraError> {
        self.query_tasks(
            "WHERE date = ?1",
            params![date.format(DATE_FORMAT).to_string()],
        )
    }

    fn tasks_in_range(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Task>, InfraError> {
        self.query_tasks(
            "WHERE date >= ?1 AND date <= ?2",
            params![
                first.format(DATE_FORMAT).to_string(),
                last.format(DATE_FORMAT).to_string()
            ],
        )
    }

    fn list_all(&self) -> Result<Vec<Task>, InfraError> {
        self.query_tasks("", [])
    }

    fn upsert(&self, task: &Task) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let tags = serde_json::to_string(&task.tags)?;
        connection.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
                 ON CONFLICT(id) DO UPDATE SET
                   parent_id = excluded.parent_id,
                   date = excluded.date,
                   start_time = excluded.start_time,
                   end_time = excluded.end_time,
                   kind = excluded.kind,
                   title = excluded.title,
                   description = excluded.description,
                   important = excluded.important,
                   completed = excluded.completed,
                   completed_at = excluded.completed_at,
                   priority = excluded.priority,
                   category = excluded.category,
                   tags = excluded.tags,
                   recurrence = excluded.recurrence,
                   recurrence_anchor = excluded.recurrence_anchor,
                   reminder_minutes = excluded.reminder_minutes,
                   updated_at = excluded.updated_at"
            ),
            params![
                task.id,
                task.parent_id,
                task.date.format(DATE_FORMAT).to_string(),
                task.start.map(|time| time.format(TIME_FORMAT).to_string()),
                task.end.map(|time| time.format(TIME_FORMAT).to_string()),
                kind_to_str(task.kind),
                task.title,
                task.description,
                task.important,
                task.completed,
                task.completed_at.map(|value| value.to_rfc3339()),
                task.priority.as_str(),
                task.category,
                tags,
                task.recurrence.as_str(),
                task.recurrence_anchor
                    .map(|date| date.format(DATE_FORMAT).to_string()),
                task.reminder_minutes,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, task_id: &str) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let removed = connection.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        Ok(removed > 0)
    }
}

/// Raw column values; conversion to `Task` happens outside the rusqlite row
/// callback so parse failures surface as `InfraError`.
struct TaskRow {
    id: String,
    parent_id: Option<String>,
    date: String,
    start_time: Option<String>,
    end_time: Option<String>,
    kind: String,
    title: String,
    description: Option<String>,
    important: bool,
    completed: bool,
    completed_at: Option<String>,
    priority: String,
    category: Option<String>,
    tags: String,
    recurrence: String,
    recurrence_anchor: Option<String>,
    reminder_minutes: Option<u32>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            date: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            kind: row.get(5)?,
            title: row.get(6)?,
            description: row.get(7)?,
            important: row.get(8)?,
            completed: row.get(9)?,
            completed_at: row.get(10)?,
            priority: row.get(11)?,
            category: row.get(12)?,
            tags: row.get(13)?,
            recurrence: row.get(14)?,
            recurrence_anchor: row.get(15)?,
            reminder_minutes: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }

    fn into_task(self) -> Result<Task, InfraError> {
        let field = |name: &str| format!("tasks.{name} of {}", self.id);
        Ok(Task {
            parent_id: self.parent_id.clone(),
            date: parse_date(&self.date, &field("date"))?,
            start: self
                .start_time
                .as_deref()
                .map(|value| parse_time(value, &field("start_time")))
                .transpose()?,
            end: self
                .end_time
                .as_deref()
                .map(|value| parse_time(value, &field("end_time")))
                .transpose()?,
            kind: parse_kind(&self.kind)
                .ok_or_else(|| corrupt(&field("kind"), &self.kind))?,
            title: self.title.clone(),
            description: self.description.clone(),
            important: self.important,
            completed: self.completed,
            completed_at: self
                .completed_at
                .as_deref()
                .map(|value| parse_timestamp(value, &field("completed_at")))
                .transpose()?,
            priority: parse_priority(&self.priority)
                .ok_or_else(|| corrupt(&field("priority"), &self.priority))?,
            category: self.category.clone(),
            tags: serde_json::from_str(&self.tags)
                .map_err(|_| corrupt(&field("tags"), &self.tags))?,
            recurrence: parse_recurrence(&self.recurrence)
                .ok_or_else(|| corrupt(&field("recurrence"), &self.recurrence))?,
            recurrence_anchor: self
                .recurrence_anchor
                .as_deref()
                .map(|value| parse_date(value, &field("recurrence_anchor")))
                .transpose()?,
            reminder_minutes: self.reminder_minutes,
            created_at: parse_timestamp(&self.created_at, &field("created_at"))?,
            updated_at: parse_timestamp(&self.updated_at, &field("updated_at"))?,
            id: self.id,
        })
    }
}

fn corrupt(field_name: &str, value: &str) -> InfraError {
    InfraError::CorruptRecord(format!("invalid {field_name}: '{value}'"))
}

fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| corrupt(field_name, value))
}

fn parse_time(value: &str, field_name: &str) -> Result<NaiveTime, InfraError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| corrupt(field_name, value))
}

fn parse_timestamp(value: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| corrupt(field_name, value))
}

fn kind_to_str(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Point => "point",
        TaskKind::Interval => "interval",
    }
}

pub fn parse_kind(value: &str) -> Option<TaskKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "point" => Some(TaskKind::Point),
        "interval" => Some(TaskKind::Interval),
        _ => None,
    }
}

pub fn parse_priority(value: &str) -> Option<Priority> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" => Some(Priority::Low),
        "medium" => Some(Priority::Medium),
        "high" => Some(Priority::High),
        _ => None,
    }
}

pub fn parse_recurrence(value: &str) -> Option<Recurrence> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" => Some(Recurrence::None),
        "daily" => Some(Recurrence::Daily),
        "weekly" => Some(Recurrence::Weekly),
        "monthly" => Some(Recurrence::Monthly),
        "yearly" => Some(Recurrence::Yearly),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Task>>, InfraError> {
        self.tasks
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("task store lock poisoned: {error}")))
    }

    fn collect_sorted<F>(&self, predicate: F) -> Result<Vec<Task>, InfraError>
    where
        F: Fn(&Task) -> bool,
    {
        let tasks = self.lock()?;
        let mut matching = tasks
            .values()
            .filter(|task| predicate(task))
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by(|left, right| {
            left.date
                .cmp(&right.date)
                .then(left.start.cmp(&right.start))
                .then_with(|| left.title.cmp(&right.title))
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(matching)
    }
}

impl TaskStore for InMemoryTaskStore {
    fn get_by_id(&self, task_id: &str) -> Result<Option<Task>, InfraError> {
        Ok(self.lock()?.get(task_id).cloned())
    }

    fn tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, InfraError> {
        self.collect_sorted(|task| task.date == date)
    }

    fn tasks_in_range(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Task>, InfraError> {
        self.collect_sorted(|task| first <= task.date && task.date <= last)
    }

    fn list_all(&self) -> Result<Vec<Task>, InfraError> {
        self.collect_sorted(|_| true)
    }

    fn upsert(&self, task: &Task) -> Result<(), InfraError> {
        self.lock()?.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn delete(&self, task_id: &str) -> Result<bool, InfraError> {
        Ok(self.lock()?.remove(task_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskDraft;
    use crate::infrastructure::storage::initialize_database;
    use tempfile::TempDir;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).expect("valid date")
    }

    fn sample_task(title: &str, day: u32) -> Task {
        let mut task = Task::new(
            TaskDraft {
                start: NaiveTime::from_hms_opt(9, 30, 0),
                end: NaiveTime::from_hms_opt(10, 45, 0),
                kind: TaskKind::Interval,
                description: Some("details".to_string()),
                important: true,
                priority: Priority::High,
                category: Some("work".to_string()),
                tags: vec!["a".to_string(), "b".to_string()],
                recurrence: Recurrence::Monthly,
                reminder_minutes: Some(5),
                ..TaskDraft::new(title, date(day))
            },
            fixed_time("2026-02-10T08:00:00Z"),
        );
        task.recurrence_anchor = Some(date(day));
        task
    }

    fn sqlite_store() -> (TempDir, SqliteTaskStore) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("tasks.sqlite");
        initialize_database(&path).expect("initialize database");
        (dir, SqliteTaskStore::new(path))
    }

    fn exercise_store(store: &dyn TaskStore) {
        let first = sample_task("first", 16);
        let mut second = sample_task("second", 17);
        second.start = None;
        second.end = None;
        second.kind = TaskKind::Point;
        let mut child = sample_task("child", 16);
        child.parent_id = Some(first.id.clone());
        child.completed = true;
        child.completed_at = Some(fixed_time("2026-02-16T11:00:00Z"));

        for task in [&first, &second, &child] {
            store.upsert(task).expect("upsert");
        }

        assert_eq!(store.get_by_id(&first.id).expect("get"), Some(first.clone()));
        assert_eq!(store.get_by_id("tsk-missing").expect("get missing"), None);
        assert_eq!(store.tasks_for_date(date(16)).expect("for date").len(), 2);
        assert_eq!(store.tasks_in_range(date(17), date(20)).expect("range"), vec![second.clone()]);
        assert_eq!(store.list_all().expect("list").len(), 3);

        let mut renamed = first.clone();
        renamed.title = "renamed".to_string();
        store.upsert(&renamed).expect("upsert existing");
        assert_eq!(
            store.get_by_id(&first.id).expect("get").map(|task| task.title),
            Some("renamed".to_string())
        );

        let deleted = store.delete_cascade(&first.id).expect("cascade");
        assert_eq!(deleted, vec![child.id.clone(), first.id.clone()]);
        assert_eq!(store.list_all().expect("list"), vec![second.clone()]);
        assert!(!store.delete(&first.id).expect("delete missing"));
        assert!(store.delete(&second.id).expect("delete"));
    }

    #[test]
    fn in_memory_store_supports_crud_and_cascade() {
        exercise_store(&InMemoryTaskStore::default());
    }

    #[test]
    fn sqlite_store_supports_crud_and_cascade() {
        let (_dir, store) = sqlite_store();
        exercise_store(&store);
    }

    #[test]
    fn sqlite_store_reports_corrupt_rows() {
        let (_dir, store) = sqlite_store();
        let task = sample_task("broken", 16);
        store.upsert(&task).expect("upsert");
        let connection = store.connect().expect("connect");
        connection
            .execute(
                "UPDATE tasks SET priority = 'urgent' WHERE id = ?1",
                params![task.id],
            )
            .expect("corrupt row");

        match store.get_by_id(&task.id) {
            Err(InfraError::CorruptRecord(message)) => assert!(message.contains("priority")),
            other => panic!("expected corrupt record error, got {other:?}"),
        }
    }
}
