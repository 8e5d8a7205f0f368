use crate::domain::models::Settings;
use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;

const SETTINGS_JSON: &str = "settings.json";
const SCHEMA_VERSION: u64 = 1;

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(SETTINGS_JSON);
    if !path.exists() {
        write_settings(&path, &Settings::default())?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SCHEMA_VERSION {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_settings(config_dir: &Path) -> Result<Settings, InfraError> {
    let path = config_dir.join(SETTINGS_JSON);
    let settings: Settings = serde_json::from_value(read_config(&path)?)?;
    settings.validate().map_err(|message| {
        InfraError::InvalidConfig(format!("{message} ({})", path.display()))
    })?;
    Ok(settings)
}

pub fn save_settings(config_dir: &Path, settings: &Settings) -> Result<(), InfraError> {
    settings.validate().map_err(InfraError::InvalidConfig)?;
    write_settings(&config_dir.join(SETTINGS_JSON), settings)
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), InfraError> {
    let mut value = serde_json::to_value(settings)?;
    let object = value.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert("schema".to_string(), serde_json::json!(SCHEMA_VERSION));

    let formatted = serde_json::to_string_pretty(&value)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}
