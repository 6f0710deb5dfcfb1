use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::types::TimelineConfig;

/// Version written by this build. Documents without the field predate it.
pub const SCHEMA_VERSION: u32 = 1;

// Embedded built-in timelines
const BUILTIN_RIPPLE: &str = include_str!("../../../../assets/timelines/Ripple.json");
const BUILTIN_TINT: &str = include_str!("../../../../assets/timelines/Tint.json");

/// Built-in timeline names in display order.
pub const BUILTIN_TIMELINES: &[(&str, &str)] = &[("Ripple", BUILTIN_RIPPLE), ("Tint", BUILTIN_TINT)];

fn legacy_schema() -> u32 {
    1
}

/// Exported/imported timeline JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDocument {
    #[serde(default = "legacy_schema")]
    pub schema_version: u32,
    #[serde(flatten)]
    pub config: TimelineConfig,
}

impl TimelineDocument {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let doc: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::MalformedDocument(e.to_string()))?;
        if doc.schema_version > SCHEMA_VERSION {
            log::warn!(
                "Timeline schema v{} is newer than supported v{SCHEMA_VERSION}; loading best-effort",
                doc.schema_version
            );
        }
        doc.config.validate()?;
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading timeline {}", path.display()))?;
        let doc = Self::from_json(&json)
            .with_context(|| format!("parsing timeline {}", path.display()))?;
        log::info!(
            "Loaded timeline {} ({} tracks, {} effects)",
            path.display(),
            doc.config.tracks.len(),
            doc.config.instance_count()
        );
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        std::fs::write(path, self.to_json_pretty()?)
            .with_context(|| format!("writing timeline {}", path.display()))?;
        Ok(())
    }

    /// Look up an embedded timeline by name (case-insensitive).
    pub fn builtin(name: &str) -> Option<Self> {
        let (_, json) = BUILTIN_TIMELINES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))?;
        match Self::from_json(json) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::error!("Failed to parse built-in timeline '{name}': {e}");
                None
            }
        }
    }
}
