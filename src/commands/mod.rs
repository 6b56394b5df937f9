pub mod evaluate;
pub mod replay;
pub mod validate;

use std::path::Path;

use crate::models::settings::{default_settings_file, Settings};

/// Loads settings from `path`, or from the per-user default location.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, String> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_settings_file()
            .map_err(|e| format!("Failed to resolve settings file: {e}"))?,
    };
    Settings::load(&path).map_err(|e| format!("Failed to load settings {}: {e}", path.display()))
}
