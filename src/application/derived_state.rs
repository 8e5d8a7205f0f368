use crate::application::commands::AppState;
use crate::domain::agenda::{build_agenda, DayAgenda};
use crate::domain::models::{Settings, Task};
use crate::domain::statistics::{aggregate, Statistics};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Values recomputed from the full task snapshot after every change.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DerivedState {
    pub generated_at: DateTime<Utc>,
    pub today: NaiveDate,
    pub agenda: DayAgenda,
    pub statistics: Statistics,
}

pub fn derive_state(
    snapshot: &[Task],
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<DerivedState, InfraError> {
    let zone = settings.time_zone().map_err(InfraError::InvalidConfig)?;
    let (working_start, working_end) = settings
        .working_hours
        .window()
        .map_err(InfraError::InvalidConfig)?;
    let today = now.with_timezone(&zone).date_naive();
    let today_tasks = snapshot
        .iter()
        .filter(|task| task.date == today)
        .cloned()
        .collect();

    Ok(DerivedState {
        generated_at: now,
        today,
        agenda: build_agenda(today_tasks, working_start, working_end),
        statistics: aggregate(snapshot, today, &zone),
    })
}

/// Latest derived state, shared with any number of readers. Readers see
/// `None` until the first publish.
#[derive(Debug)]
pub struct DerivedStatePublisher {
    sender: watch::Sender<Option<Arc<DerivedState>>>,
}

impl Default for DerivedStatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl DerivedStatePublisher {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DerivedState>>> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        snapshot: &[Task],
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> Result<Arc<DerivedState>, InfraError> {
        let derived = Arc::new(derive_state(snapshot, settings, now)?);
        self.sender.send_replace(Some(derived.clone()));
        Ok(derived)
    }
}

/// Background task that republishes derived state on a fixed period so the
/// agenda rolls over at midnight without a write.
pub struct RefreshTicker {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTicker {
    /// Stops the ticker and waits for the loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(error) = handle.await {
                tracing::warn!(error = %error, "refresh ticker ended abnormally");
            }
        }
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub fn spawn_refresh_ticker(state: Arc<AppState>, period: Duration) -> RefreshTicker {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(error) = state.refresh_derived_state() {
                        tracing::warn!(error = %error, "scheduled refresh failed");
                    }
                }
                _ = &mut stop_rx => break,
            }
        }
        tracing::debug!("refresh ticker stopped");
    });

    RefreshTicker {
        stop_tx: Some(stop_tx),
        handle: Some(handle),
    }
}
