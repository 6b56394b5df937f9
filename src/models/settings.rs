//! Persisted settings (settings.json).
//! schemaVersion: 1

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algorithm::mouse_warp::WarpConfig;
use crate::error::{Error, Result};

pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Options for evaluation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationSettings {
    /// Directory holding `data/` (sessions, screenshots) and `evaluation/` (output).
    pub data_root: PathBuf,
    pub draw_overlays: bool,
    pub write_log: bool,
    /// Radius of overlay markers in pixels.
    pub marker_radius: u32,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        EvaluationSettings {
            data_root: PathBuf::from("."),
            draw_overlays: false,
            write_log: true,
            marker_radius: 5,
        }
    }
}

/// Root object of settings.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub warp: WarpConfig,
    pub evaluation: EvaluationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            schema_version: SCHEMA_VERSION,
            warp: WarpConfig::default(),
            evaluation: EvaluationSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`.
    ///
    /// A missing file yields defaults. A file that fails to parse is logged and
    /// replaced by defaults; a file with another schema version is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("settings: {} not found, using defaults", path.display());
            return Ok(Settings::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let settings = match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "settings: failed to parse {}: {e}; using defaults",
                    path.display()
                );
                return Ok(Settings::default());
            }
        };

        if settings.schema_version != SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                path: path.display().to_string(),
                expected: SCHEMA_VERSION,
                got: settings.schema_version,
            });
        }

        settings.warp.validate()?;
        log::info!("settings: loaded {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("settings: saved {}", path.display());
        Ok(())
    }
}

/// `{config_dir}/GazeWarp/settings.json`.
pub fn default_settings_file() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .ok_or_else(|| Error::InvalidConfig("failed to resolve config directory".to_string()))?;
    Ok(base.join("GazeWarp").join("settings.json"))
}
