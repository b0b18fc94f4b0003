//! Configuration file handling for devdock
//!
//! Supports:
//! - `.devdock/config.toml` - Workspace settings
//! - `.vscode/launch.json` - Per-folder launch descriptors
//! - `<config_dir>/devdock/devices.toml` - Manual devices and current selection

pub mod devices;
pub mod launch;
pub mod settings;
pub mod types;

pub use devices::{default_devices_path, load_devices_file, save_devices_file, FileDeviceStore};
pub use launch::{load_launch_descriptors, save_launch_descriptors, FileLaunchStore};
pub use settings::load_settings;
pub use types::*;
