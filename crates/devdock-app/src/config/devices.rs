//! User-level device store (`devices.toml`)
//!
//! Manual devices and the current-device selection are global to the user,
//! not per workspace.

use std::io::Write;
use std::path::{Path, PathBuf};

use devdock_core::prelude::*;
use fs2::FileExt;

use super::types::{DevicesFile, ManualDevice};
use crate::host::DeviceStore;

const DEVICES_FILENAME: &str = "devices.toml";

/// Default location: `<config_dir>/devdock/devices.toml`
pub fn default_devices_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("devdock").join(DEVICES_FILENAME))
}

/// Persists manual devices to a TOML file
#[derive(Debug, Clone)]
pub struct FileDeviceStore {
    path: PathBuf,
}

impl FileDeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default user-level location
    pub fn user_default() -> Result<Self> {
        default_devices_path()
            .map(Self::new)
            .ok_or_else(|| Error::config("Could not determine user config directory"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<DevicesFile> {
        load_devices_file(&self.path)
    }

    fn update(&self, f: impl FnOnce(&mut DevicesFile)) -> Result<()> {
        let mut file = self.load()?;
        f(&mut file);
        save_devices_file(&self.path, &file)
    }
}

/// Read a devices file; a missing file reads as empty
pub fn load_devices_file(path: &Path) -> Result<DevicesFile> {
    if !path.exists() {
        trace!("No devices file at {:?}", path);
        return Ok(DevicesFile::default());
    }

    let content = std::fs::read_to_string(path)?;
    let file = toml::from_str(&content)?;
    Ok(file)
}

/// Write a devices file under an exclusive lock
pub fn save_devices_file(path: &Path, file: &DevicesFile) -> Result<()> {
    let content = toml::to_string_pretty(file)
        .map_err(|e| Error::config(format!("Failed to serialize devices: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::config(format!("Failed to create config directory: {}", e)))?;
    }

    let mut handle = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::config(format!("Failed to open devices.toml: {}", e)))?;

    handle
        .lock_exclusive()
        .map_err(|e| Error::config(format!("Failed to lock devices.toml: {}", e)))?;

    handle
        .set_len(0)
        .and_then(|_| handle.write_all(content.as_bytes()))
        .and_then(|_| handle.flush())
        .map_err(|e| Error::config(format!("Failed to write devices.toml: {}", e)))?;

    debug!("Saved {} manual devices to {:?}", file.devices.len(), path);
    Ok(())
}

impl DeviceStore for FileDeviceStore {
    async fn manual_devices(&self) -> Result<Vec<ManualDevice>> {
        Ok(self.load()?.devices)
    }

    async fn set_manual_devices(&self, devices: Vec<ManualDevice>) -> Result<()> {
        self.update(|file| file.devices = devices)
    }

    async fn current_device_id(&self) -> Result<Option<String>> {
        Ok(self.load()?.current_device)
    }

    async fn set_current_device_id(&self, id: Option<String>) -> Result<()> {
        self.update(|file| file.current_device = id)
    }
}
