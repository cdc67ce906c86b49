use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RecountError, Result};

/// Paths to the four source spreadsheets. The registry often lives on a
/// network share, so it carries an optional local fallback copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcePaths {
    #[serde(default)]
    pub timesheet: String,
    #[serde(default)]
    pub rates: String,
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub registry_fallback: String,
    #[serde(default)]
    pub invoices: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Jobcode prefix marking internal/overhead buckets; entries logged
    /// against it take their project number from the secondary jobcode.
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,
    /// The month with a mid-month rate change, as "YYYY-MM". Empty means
    /// no bifurcated month.
    #[serde(default)]
    pub split_month: String,
    #[serde(default)]
    pub sources: SourcePaths,
}

fn default_internal_prefix() -> String {
    "OVH".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            internal_prefix: default_internal_prefix(),
            split_month: String::new(),
            sources: SourcePaths::default(),
        }
    }
}

impl Settings {
    /// Parse `split_month` into (year, month). Malformed values mean no
    /// bifurcation rather than a failed run.
    pub fn split_month_parts(&self) -> Option<(i32, u32)> {
        let parts: Vec<&str> = self.split_month.split('-').collect();
        if parts.len() != 2 {
            return None;
        }
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        if (1..=12).contains(&month) {
            Some((year, month))
        } else {
            None
        }
    }
}

fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RECOUNT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("recount")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("recount")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| RecountError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn db_path() -> PathBuf {
    get_data_dir().join("recount.db")
}
