use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timeline::AccumulationMode;

/// Per-user defaults for the command-line driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsConfig {
    pub version: u32,
    #[serde(default = "default_grid")]
    pub default_grid: [u32; 2],
    #[serde(default)]
    pub default_accumulation: AccumulationMode,
    #[serde(default)]
    pub last_timeline: Option<PathBuf>,
}

fn default_grid() -> [u32; 2] {
    [160, 160]
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            version: 1,
            default_grid: default_grid(),
            default_accumulation: AccumulationMode::None,
            last_timeline: None,
        }
    }
}

impl SettingsConfig {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pixelgrain").join("settings.json"))
    }

    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Missing or unreadable settings fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed settings {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            self.save_to(&path);
        }
    }

    /// Best effort: failures are logged, never returned.
    pub fn save_to(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Failed to serialize settings: {e}"),
        }
    }
}
