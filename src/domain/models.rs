use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Last representable minute of a day; times after it belong to no valid task.
pub fn latest_time_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).expect("valid fixed time")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Point,
    Interval,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// User-editable portion of a task. Creation and full-replacement updates both
/// start from a draft; identity, completion and bookkeeping are system-owned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDraft {
    pub parent_id: Option<String>,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub kind: TaskKind,
    pub title: String,
    pub description: Option<String>,
    pub important: bool,
    pub priority: Priority,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub recurrence: Recurrence,
    pub reminder_minutes: Option<u32>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            parent_id: None,
            date,
            start: None,
            end: None,
            kind: TaskKind::Point,
            title: title.into(),
            description: None,
            important: false,
            priority: Priority::Medium,
            category: None,
            tags: Vec::new(),
            recurrence: Recurrence::None,
            reminder_minutes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub parent_id: Option<String>,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub kind: TaskKind,
    pub title: String,
    pub description: Option<String>,
    pub important: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub recurrence: Recurrence,
    pub recurrence_anchor: Option<NaiveDate>,
    pub reminder_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: next_id("tsk"),
            parent_id: draft.parent_id,
            date: draft.date,
            start: draft.start,
            end: draft.end,
            kind: draft.kind,
            title: draft.title,
            description: draft.description,
            important: draft.important,
            completed: false,
            completed_at: None,
            priority: draft.priority,
            category: draft.category,
            tags: draft.tags,
            recurrence: draft.recurrence,
            recurrence_anchor: None,
            reminder_minutes: draft.reminder_minutes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full replacement of the editable fields. Identity, completion state and
    /// `created_at` carry over from `self`.
    pub fn replaced_with(&self, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        let recurrence_anchor = if draft.recurrence == self.recurrence && draft.date == self.date {
            self.recurrence_anchor
        } else {
            None
        };
        Self {
            id: self.id.clone(),
            parent_id: draft.parent_id,
            date: draft.date,
            start: draft.start,
            end: draft.end,
            kind: draft.kind,
            title: draft.title,
            description: draft.description,
            important: draft.important,
            completed: self.completed,
            completed_at: self.completed_at,
            priority: draft.priority,
            category: draft.category,
            tags: draft.tags,
            recurrence: draft.recurrence,
            recurrence_anchor,
            reminder_minutes: draft.reminder_minutes,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if let Some(parent_id) = &self.parent_id {
            validate_non_empty(parent_id, "task.parent_id")?;
            if parent_id == &self.id {
                return Err("task.parent_id must not reference the task itself".to_string());
            }
        }
        if self.completed_at.is_some() && !self.completed {
            return Err("task.completed_at requires task.completed".to_string());
        }
        Ok(())
    }

    pub fn is_interval(&self) -> bool {
        self.kind == TaskKind::Interval
    }

    pub fn is_main_activity(&self) -> bool {
        self.parent_id.is_none() && self.end.is_some()
    }

    pub fn normalized_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    System,
    Light,
    Dark,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

impl WorkingHours {
    pub fn validate(&self) -> Result<(), String> {
        let (start, end) = self.window()?;
        if end <= start {
            return Err("settings.workingHours.end must be after start".to_string());
        }
        Ok(())
    }

    pub fn window(&self) -> Result<(NaiveTime, NaiveTime), String> {
        let start = parse_hhmm(&self.start)
            .ok_or_else(|| "settings.workingHours.start must be HH:MM".to_string())?;
        let end = parse_hhmm(&self.end)
            .ok_or_else(|| "settings.workingHours.end must be HH:MM".to_string())?;
        Ok((start, end))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub accent_color: String,
    pub notifications_enabled: bool,
    pub default_reminder_minutes: Option<u32>,
    pub week_start: String,
    pub working_hours: WorkingHours,
    pub language: String,
    pub timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            accent_color: "#3B82F6".to_string(),
            notifications_enabled: true,
            default_reminder_minutes: Some(10),
            week_start: "Monday".to_string(),
            working_hours: WorkingHours {
                start: "09:00".to_string(),
                end: "18:00".to_string(),
            },
            language: "en".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        self.working_hours.validate()?;
        validate_hex_color(&self.accent_color, "settings.accentColor")?;
        validate_non_empty(&self.language, "settings.language")?;
        self.week_start_day()?;
        self.time_zone()?;
        Ok(())
    }

    pub fn week_start_day(&self) -> Result<Weekday, String> {
        parse_weekday(&self.week_start)
            .ok_or_else(|| format!("settings.weekStart is not a weekday: {}", self.week_start))
    }

    pub fn time_zone(&self) -> Result<Tz, String> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| format!("settings.timezone is not a known zone: {}", self.timezone))
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_hex_color(value: &str, field_name: &str) -> Result<(), String> {
    let Some(digits) = value.trim().strip_prefix('#') else {
        return Err(format!("{field_name} must be #RRGGBB"));
    };
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("{field_name} must be #RRGGBB"));
    }
    Ok(())
}

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_draft() -> TaskDraft {
        TaskDraft {
            start: NaiveTime::from_hms_opt(9, 0, 0),
            end: NaiveTime::from_hms_opt(10, 30, 0),
            kind: TaskKind::Interval,
            category: Some("work".to_string()),
            tags: vec!["deep".to_string()],
            recurrence: Recurrence::Weekly,
            reminder_minutes: Some(15),
            ..TaskDraft::new(
                "Write report",
                NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date"),
            )
        }
    }

    #[test]
    fn new_task_sets_bookkeeping_from_now() {
        let now = fixed_time("2026-02-16T08:00:00Z");
        let task = Task::new(sample_draft(), now);
        assert!(task.id.starts_with("tsk-"));
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert!(task.validate().is_ok());
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = next_id("tsk");
        let second = next_id("tsk");
        assert_ne!(first, second);
    }

    #[test]
    fn replacement_preserves_identity_and_created_at() {
        let created = Task::new(sample_draft(), fixed_time("2026-02-16T08:00:00Z"));
        let mut draft = sample_draft();
        draft.title = "Rewrite report".to_string();
        let later = fixed_time("2026-02-16T12:00:00Z");

        let replaced = created.replaced_with(draft, later);
        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.created_at, created.created_at);
        assert_eq!(replaced.updated_at, later);
        assert_eq!(replaced.title, "Rewrite report");
    }

    #[test]
    fn task_validate_rejects_blank_title() {
        let mut task = Task::new(sample_draft(), fixed_time("2026-02-16T08:00:00Z"));
        task.title = "   ".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn task_validate_rejects_self_parent() {
        let mut task = Task::new(sample_draft(), fixed_time("2026-02-16T08:00:00Z"));
        task.parent_id = Some(task.id.clone());
        assert!(task.validate().is_err());
    }

    #[test]
    fn main_activity_requires_no_parent_and_an_end() {
        let mut task = Task::new(sample_draft(), fixed_time("2026-02-16T08:00:00Z"));
        assert!(task.is_main_activity());
        task.parent_id = Some("tsk-parent".to_string());
        assert!(!task.is_main_activity());
        task.parent_id = None;
        task.end = None;
        assert!(!task.is_main_activity());
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.week_start_day(), Ok(Weekday::Mon));
        assert_eq!(settings.time_zone(), Ok(Tz::UTC));
    }

    #[test]
    fn settings_validate_rejects_inverted_working_hours() {
        let mut settings = Settings::default();
        settings.working_hours.start = "18:00".to_string();
        settings.working_hours.end = "09:00".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn working_hours_reject_malformed_times() {
        for (start, end) in [("24:00", "18:00"), ("09:00", "18:60"), ("9am", "18:00"), ("09:00:00", "18:00")] {
            let hours = WorkingHours {
                start: start.to_string(),
                end: end.to_string(),
            };
            assert!(hours.validate().is_err(), "{start}-{end} should be rejected");
        }
    }

    #[test]
    fn settings_validate_rejects_unknown_zone_and_bad_color() {
        let mut settings = Settings::default();
        settings.timezone = "Mars/Olympus".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.accent_color = "blue".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn domain_models_support_serde_roundtrip() {
        let task = Task::new(sample_draft(), fixed_time("2026-02-16T08:00:00Z"));
        let settings = Settings::default();

        let task_roundtrip: Task =
            serde_json::from_str(&serde_json::to_string(&task).expect("serialize task"))
                .expect("deserialize task");
        let settings_json = serde_json::to_value(&settings).expect("serialize settings");
        assert!(settings_json.get("workingHours").is_some());
        let settings_roundtrip: Settings =
            serde_json::from_value(settings_json).expect("deserialize settings");

        assert_eq!(task_roundtrip, task);
        assert_eq!(settings_roundtrip, settings);
    }
}
