//! Settings parser for .devdock/config.toml

use super::types::Settings;
use devdock_core::prelude::*;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.toml";
const DEVDOCK_DIR: &str = ".devdock";

/// Load settings from `.devdock/config.toml`
///
/// A missing or unparsable file falls back to defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(DEVDOCK_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}
