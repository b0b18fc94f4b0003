//! Collaborator interfaces supplied by the host environment
//!
//! The orchestrator never talks to the editor, the filesystem layout of
//! launch descriptors, or the device CLI directly. Each of those sits behind
//! one of the traits here so the headless binary and the tests can swap in
//! their own implementations.
//!
//! Async traits use `trait_variant`: implement the `Send` variant
//! (`DeviceProbe`, `UserInterface`, ...) and bound generic code on it.

use std::path::{Path, PathBuf};

use devdock_core::prelude::*;
use devdock_core::Device;
use devdock_probe::{AgentVersion, WifiConnectResult, WifiNetwork};
use serde_json::Value;

use crate::config::ManualDevice;

/// Severity of a message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Host commands the orchestrator may ask the user interface to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Open the settings entry for the SDK path
    ConfigureSdkPath,
    /// Start the add-device flow
    AddDevice,
    /// Start the select-device flow
    SelectDevice,
    /// Reload the editor window so new launch descriptors are picked up
    ReloadWindow,
    /// Refresh views that list folders and targets
    RefreshViews,
}

/// Current set of workspace folders
pub trait Workspace: Send + Sync {
    fn folders(&self) -> Vec<PathBuf>;
}

/// Prompts, pickers and commands
///
/// Every prompt may be dismissed, which is reported as `None`.
#[trait_variant::make(UserInterface: Send)]
pub trait LocalUserInterface {
    /// Show a message, optionally with action buttons; returns the chosen action
    async fn show_message(
        &self,
        level: MessageLevel,
        message: &str,
        actions: &[&str],
    ) -> Option<String>;

    /// Ask for a line of text
    async fn input(&self, prompt: &str, secret: bool) -> Option<String>;

    /// Pick one item; returns its index
    async fn pick(&self, title: &str, items: &[String]) -> Option<usize>;

    /// Run a host command
    async fn execute(&self, command: HostCommand);
}

/// Decides whether a folder participates in the debug workflow
///
/// Never fails: anything that cannot be determined counts as not managed.
#[trait_variant::make(ProjectClassifier: Send)]
pub trait LocalProjectClassifier {
    async fn is_managed_project(&self, path: &Path) -> bool;
}

/// Device discovery and remote agent operations
#[trait_variant::make(DeviceProbe: Send)]
pub trait LocalDeviceProbe {
    /// Devices currently visible on the network
    async fn discover(&self) -> Result<Vec<Device>>;

    async fn agent_version(&self, device: &Device) -> Result<AgentVersion>;

    async fn update_agent(&self, device: &Device) -> Result<()>;

    async fn wifi_scan(&self, device: &Device) -> Result<Vec<WifiNetwork>>;

    async fn wifi_connect(
        &self,
        device: &Device,
        ssid: &str,
        password: Option<&str>,
    ) -> Result<WifiConnectResult>;
}

/// Per-folder launch descriptor list
///
/// Entries are kept as raw JSON so descriptors owned by other tools survive
/// a read-modify-write cycle untouched.
#[trait_variant::make(LaunchStore: Send)]
pub trait LocalLaunchStore {
    async fn get_launch_descriptors(&self, folder: &Path) -> Result<Vec<Value>>;

    async fn set_launch_descriptors(&self, folder: &Path, descriptors: Vec<Value>) -> Result<()>;
}

/// Persistent manual device list and current-device selection
#[trait_variant::make(DeviceStore: Send)]
pub trait LocalDeviceStore {
    async fn manual_devices(&self) -> Result<Vec<ManualDevice>>;

    async fn set_manual_devices(&self, devices: Vec<ManualDevice>) -> Result<()>;

    async fn current_device_id(&self) -> Result<Option<String>>;

    async fn set_current_device_id(&self, id: Option<String>) -> Result<()>;
}
