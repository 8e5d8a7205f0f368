use crate::infrastructure::config::{ensure_default_configs, load_settings};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

const DATABASE_FILE: &str = "dayplan.sqlite";

#[derive(Debug, Clone)]
pub struct BootstrapResult {
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

pub fn workspace_layout(workspace_root: &Path) -> BootstrapResult {
    BootstrapResult {
        config_dir: workspace_root.join("config"),
        logs_dir: workspace_root.join("logs"),
        database_path: workspace_root.join("state").join(DATABASE_FILE),
    }
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let layout = workspace_layout(workspace_root);
    let state_dir = workspace_root.join("state");

    fs::create_dir_all(&layout.config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&layout.logs_dir)?;

    ensure_default_configs(&layout.config_dir)?;
    let _ = load_settings(&layout.config_dir)?;
    initialize_database(&layout.database_path)?;

    Ok(layout)
}
