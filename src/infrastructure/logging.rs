use crate::infrastructure::error::InfraError;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "DAYPLAN_LOG";
const LOG_FILE_NAME: &str = "dayplan.log";

/// Installs a JSON-lines subscriber writing to `logs_dir/dayplan.log`.
/// Keep the returned guard alive for as long as events should be flushed.
pub fn init_logging(logs_dir: &Path) -> Result<WorkerGuard, InfraError> {
    let appender = tracing_appender::rolling::never(logs_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(writer)
        .try_init()
        .map_err(|error| InfraError::InvalidConfig(format!("failed to install logger: {error}")))?;
    Ok(guard)
}
