pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod reminder_sink;
pub mod storage;
pub mod task_repository;
