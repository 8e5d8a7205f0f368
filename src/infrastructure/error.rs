use crate::domain::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("Stored data is corrupt: {0}")]
    CorruptRecord(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
