use crate::domain::models::Task;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Fire-and-forget reminder delivery. The caller decides whether a reminder is
/// needed; sinks only hand the request to the platform.
pub trait ReminderSink: Send + Sync {
    fn schedule(&self, task: &Task, fire_at: DateTime<Utc>) -> Result<(), InfraError>;
    fn cancel(&self, task_id: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Default)]
pub struct LoggingReminderSink;

impl ReminderSink for LoggingReminderSink {
    fn schedule(&self, task: &Task, fire_at: DateTime<Utc>) -> Result<(), InfraError> {
        tracing::info!(
            task_id = %task.id,
            title = %task.title,
            fire_at = %fire_at.to_rfc3339(),
            "reminder scheduled"
        );
        Ok(())
    }

    fn cancel(&self, task_id: &str) -> Result<(), InfraError> {
        tracing::info!(task_id, "reminder cancelled");
        Ok(())
    }
}

/// Records requests instead of delivering them.
#[derive(Debug, Default)]
pub struct InMemoryReminderSink {
    scheduled: Mutex<HashMap<String, DateTime<Utc>>>,
    cancelled: Mutex<Vec<String>>,
}

impl InMemoryReminderSink {
    pub fn scheduled_at(&self, task_id: &str) -> Option<DateTime<Utc>> {
        lock(&self.scheduled).ok()?.get(task_id).copied()
    }

    pub fn scheduled_count(&self) -> usize {
        lock(&self.scheduled).map(|scheduled| scheduled.len()).unwrap_or(0)
    }

    pub fn cancelled(&self) -> Vec<String> {
        lock(&self.cancelled)
            .map(|cancelled| cancelled.clone())
            .unwrap_or_default()
    }
}

impl ReminderSink for InMemoryReminderSink {
    fn schedule(&self, task: &Task, fire_at: DateTime<Utc>) -> Result<(), InfraError> {
        lock(&self.scheduled)?.insert(task.id.clone(), fire_at);
        Ok(())
    }

    fn cancel(&self, task_id: &str) -> Result<(), InfraError> {
        lock(&self.scheduled)?.remove(task_id);
        lock(&self.cancelled)?.push(task_id.to_string());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, InfraError> {
    mutex
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("reminder sink lock poisoned: {error}")))
}
