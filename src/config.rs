use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ping_executor::DEFAULT_TIMEOUT;
use crate::statistics::LossFormula;

/// Optional user settings, read from `<config dir>/echoprobe/config.json`.
/// Probe count, payload size and interval are fixed and not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timeout_ms: u64,
    pub loss_formula: LossFormula,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            loss_formula: LossFormula::default(),
        }
    }
}

impl AppConfig {
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("echoprobe").join("config.json"))
    }

    /// Loads the user config, falling back to defaults when it is missing or bad.
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("ignoring {}: {e}", path.display());
                AppConfig::default()
            }),
            _ => AppConfig::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        if config.timeout_ms == 0 {
            return Err("timeout_ms must be greater than zero".into());
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
