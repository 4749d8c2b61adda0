use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub scan_timeout_secs: u64,
    /// Only report peripherals advertising one of these services. Empty = all.
    pub service_uuids: Vec<Uuid>,
    /// Advertised names that end a scan as soon as one is found.
    pub target_names: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: DEFAULT_SCAN_TIMEOUT_SECS,
            service_uuids: Vec::new(),
            target_names: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn is_target(&self, name: Option<&str>) -> bool {
        name.is_some_and(|name| self.target_names.iter().any(|t| t == name))
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("dev", "blescanner", "ble-scanner").ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}

pub fn save_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    Ok(())
}

/// Reads the config at `path`; a missing file is created with defaults.
pub fn load_or_init(path: &Path) -> Result<AppConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = AppConfig::default();
            save_to(path, &config)?;
            log::info!("wrote default config to {}", path.display());
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}
