//! Configuration types for devdock
//!
//! Defines:
//! - `Settings` - Workspace settings (`.devdock/config.toml`)
//! - `DebuggerBackend` - Which native debugger descriptor shape to emit
//! - `ManualDevice` / `DevicesFile` - User-level device list (`devices.toml`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use devdock_core::Device;

/// Workspace settings (.devdock/config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub native: NativeSettings,

    #[serde(default)]
    pub script: ScriptSettings,

    #[serde(default)]
    pub readiness: ReadinessSettings,

    #[serde(default)]
    pub probe: ProbeSettings,
}

/// Native debugger backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebuggerBackend {
    /// Attach-mode descriptor driven by init and attach commands
    #[default]
    LldbAttach,
    /// Launch-mode descriptor carrying the device address directly
    LldbDap,
}

impl fmt::Display for DebuggerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebuggerBackend::LldbAttach => write!(f, "lldb-attach"),
            DebuggerBackend::LldbDap => write!(f, "lldb-dap"),
        }
    }
}

/// Native target settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NativeSettings {
    /// Device SDK location (tilde is expanded, symlinks resolved)
    #[serde(default)]
    pub sdk_path: Option<String>,

    #[serde(default)]
    pub backend: DebuggerBackend,

    /// Build output directory, relative to the folder
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
}

impl Default for NativeSettings {
    fn default() -> Self {
        Self {
            sdk_path: None,
            backend: DebuggerBackend::default(),
            build_dir: default_build_dir(),
        }
    }
}

fn default_build_dir() -> String {
    ".build/debug".to_string()
}

/// Script target settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptSettings {
    /// Working directory of the program on the device
    #[serde(default = "default_remote_root")]
    pub remote_root: String,

    /// Delay before attaching, giving the remote debug server time to listen
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            remote_root: default_remote_root(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl ScriptSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_remote_root() -> String {
    "/app".to_string()
}

fn default_settle_delay_ms() -> u64 {
    1000
}

/// Workspace readiness settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadinessSettings {
    /// Upper bound on waiting for toolchain folder events
    #[serde(default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            fallback_timeout_ms: default_fallback_timeout_ms(),
        }
    }
}

impl ReadinessSettings {
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }
}

fn default_fallback_timeout_ms() -> u64 {
    5000
}

/// Device CLI settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeSettings {
    #[serde(default = "default_probe_command")]
    pub command: String,

    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            command: default_probe_command(),
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_probe_command() -> String {
    devdock_probe::DEFAULT_PROBE_COMMAND.to_string()
}

fn default_probe_timeout_secs() -> u64 {
    devdock_probe::DEFAULT_PROBE_TIMEOUT.as_secs()
}

/// A manually registered device as persisted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManualDevice {
    pub id: String,
    pub address: String,
}

impl ManualDevice {
    pub fn to_device(&self) -> Device {
        Device::manual(&self.id, &self.address)
    }
}

/// User-level device file (devices.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DevicesFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_device: Option<String>,

    #[serde(default)]
    pub devices: Vec<ManualDevice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(settings.native.sdk_path.is_none());
        assert_eq!(settings.native.backend, DebuggerBackend::LldbAttach);
        assert_eq!(settings.native.build_dir, ".build/debug");
        assert_eq!(settings.script.remote_root, "/app");
        assert_eq!(settings.script.settle_delay(), Duration::from_secs(1));
        assert_eq!(settings.readiness.fallback_timeout(), Duration::from_secs(5));
        assert_eq!(settings.probe.command, "devdockctl");
    }

    #[test]
    fn test_settings_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
[native]
sdk_path = "~/sdks/kit.sdk"
backend = "lldb-dap"

[readiness]
fallback_timeout_ms = 2500
"#,
        )
        .unwrap();

        assert_eq!(settings.native.sdk_path.as_deref(), Some("~/sdks/kit.sdk"));
        assert_eq!(settings.native.backend, DebuggerBackend::LldbDap);
        assert_eq!(settings.native.build_dir, ".build/debug");
        assert_eq!(settings.readiness.fallback_timeout_ms, 2500);
        assert_eq!(settings.script.settle_delay_ms, 1000);
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(DebuggerBackend::LldbAttach.to_string(), "lldb-attach");
        assert_eq!(DebuggerBackend::LldbDap.to_string(), "lldb-dap");
    }

    #[test]
    fn test_devices_file_roundtrip_shape() {
        let file: DevicesFile = toml::from_str(
            r#"
current_device = "a1"

[[devices]]
id = "a1"
address = "10.0.0.5"
"#,
        )
        .unwrap();

        assert_eq!(file.current_device.as_deref(), Some("a1"));
        assert_eq!(file.devices[0].to_device().address, "10.0.0.5");
    }
}
