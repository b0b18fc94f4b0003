//! Core domain types for devdock

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Devices
// ─────────────────────────────────────────────────────────────────────────────

/// How a device is reachable from the development machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Ethernet,
    Usb,
    /// Discovered via LAN service announcement
    Lan,
    /// Entered by the user, persisted across sessions
    Manual,
}

impl InterfaceKind {
    /// Prefix used to build stable ids for discovered devices
    pub fn id_prefix(&self) -> &'static str {
        match self {
            InterfaceKind::Ethernet => "ethernet",
            InterfaceKind::Usb => "usb",
            InterfaceKind::Lan => "lan",
            InterfaceKind::Manual => "manual",
        }
    }

    pub fn is_discovered(&self) -> bool {
        !matches!(self, InterfaceKind::Manual)
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKind::Ethernet => write!(f, "Ethernet"),
            InterfaceKind::Usb => write!(f, "USB"),
            InterfaceKind::Lan => write!(f, "LAN"),
            InterfaceKind::Manual => write!(f, "Manually added"),
        }
    }
}

/// A network-attached device
///
/// Manual and discovered entries are never reconciled by address, so the same
/// physical device can appear twice with different ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique id (UUID for manual entries, `<kind>:<hostname>` for discovered)
    pub id: String,

    /// `hostname` or `hostname:port`
    pub address: String,

    /// Human-readable name
    pub name: String,

    pub interface: InterfaceKind,

    /// Last known agent/firmware version
    #[serde(default)]
    pub agent_version: Option<String>,

    /// When discovery last reported this device (never set for manual entries)
    #[serde(skip)]
    pub last_seen: Option<DateTime<Local>>,
}

impl Device {
    /// Create a manually registered device
    pub fn manual(id: impl Into<String>, address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            id: id.into(),
            name: address.clone(),
            address,
            interface: InterfaceKind::Manual,
            agent_version: None,
            last_seen: None,
        }
    }

    /// Create a device reported by network discovery
    pub fn discovered(
        interface: InterfaceKind,
        hostname: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        let hostname = hostname.into();
        Self {
            id: format!("{}:{}", interface.id_prefix(), hostname),
            name: name.unwrap_or_else(|| hostname.clone()),
            address: hostname,
            interface,
            agent_version: None,
            last_seen: Some(Local::now()),
        }
    }

    pub fn with_agent_version(mut self, version: Option<String>) -> Self {
        self.agent_version = version;
        self
    }

    /// Address without any `:port` suffix
    pub fn hostname(&self) -> &str {
        split_host_port(&self.address)
            .map(|(host, _)| host)
            .unwrap_or(&self.address)
    }

    /// Get a display string for the device
    pub fn display_name(&self) -> String {
        if self.name == self.address {
            format!("{} ({})", self.name, self.interface)
        } else {
            format!("{} - {} ({})", self.name, self.address, self.interface)
        }
    }

    /// Check if device matches a specifier
    ///
    /// The specifier can be:
    /// - Exact device id
    /// - Exact address
    /// - Device name (case-insensitive)
    pub fn matches(&self, specifier: &str) -> bool {
        self.id == specifier
            || self.address == specifier
            || self.name.eq_ignore_ascii_case(specifier)
    }
}

/// Split `host:port` into its parts.
///
/// Returns `None` when the address carries no numeric port. Bare IPv6
/// literals (more than one colon, no brackets) are treated as portless.
pub fn split_host_port(address: &str) -> Option<(&str, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return None;
    }
    let port = port.parse::<u16>().ok()?;
    Some((host, port))
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspace folders
// ─────────────────────────────────────────────────────────────────────────────

/// Classification state of a workspace folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Classification {
    #[default]
    Unclassified,
    NotManaged,
    Managed,
}

impl From<bool> for Classification {
    fn from(managed: bool) -> Self {
        if managed {
            Classification::Managed
        } else {
            Classification::NotManaged
        }
    }
}

/// Runtime a folder's targets execute on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetRuntime {
    /// Compiled binary debugged through a remote gdb server
    #[default]
    Native,
    /// Interpreted program debugged by attaching to a remote debug server
    Script,
}

impl fmt::Display for TargetRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRuntime::Native => write!(f, "native"),
            TargetRuntime::Script => write!(f, "script"),
        }
    }
}

/// An executable target exposed by a toolchain context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnableTarget {
    pub name: String,
}

impl RunnableTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_device_defaults() {
        let device = Device::manual("abc", "10.0.0.5:2222");
        assert_eq!(device.interface, InterfaceKind::Manual);
        assert_eq!(device.name, "10.0.0.5:2222");
        assert!(device.last_seen.is_none());
        assert_eq!(device.hostname(), "10.0.0.5");
    }

    #[test]
    fn test_discovered_device_has_stable_id() {
        let a = Device::discovered(InterfaceKind::Lan, "board.local", None);
        let b = Device::discovered(InterfaceKind::Lan, "board.local", Some("Board".into()));
        assert_eq!(a.id, "lan:board.local");
        assert_eq!(a.id, b.id);
        assert_eq!(b.name, "Board");
        assert!(a.last_seen.is_some());
    }

    #[test]
    fn test_display_name() {
        let device = Device::manual("1", "host1");
        assert_eq!(device.display_name(), "host1 (Manually added)");

        let device = Device::discovered(InterfaceKind::Usb, "10.1.1.1", Some("Dev Kit".into()));
        assert_eq!(device.display_name(), "Dev Kit - 10.1.1.1 (USB)");
    }

    #[test]
    fn test_device_matches() {
        let device = Device::discovered(InterfaceKind::Ethernet, "kit.local", Some("Kit".into()));
        assert!(device.matches("ethernet:kit.local"));
        assert!(device.matches("kit.local"));
        assert!(device.matches("KIT"));
        assert!(!device.matches("other"));
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("10.0.0.5:9999"), Some(("10.0.0.5", 9999)));
        assert_eq!(split_host_port("10.0.0.5"), None);
        assert_eq!(split_host_port("host:notaport"), None);
        assert_eq!(split_host_port("fe80::1"), None);
        assert_eq!(split_host_port("[fe80::1]:22"), Some(("[fe80::1]", 22)));
        assert_eq!(split_host_port(":22"), None);
    }

    #[test]
    fn test_classification_from_bool() {
        assert_eq!(Classification::from(true), Classification::Managed);
        assert_eq!(Classification::from(false), Classification::NotManaged);
        assert_eq!(Classification::default(), Classification::Unclassified);
    }

    #[test]
    fn test_interface_kind_serde() {
        let json = serde_json::to_string(&InterfaceKind::Usb).unwrap();
        assert_eq!(json, "\"usb\"");
        let kind: InterfaceKind = serde_json::from_str("\"lan\"").unwrap();
        assert_eq!(kind, InterfaceKind::Lan);
        assert!(kind.is_discovered());
        assert!(!InterfaceKind::Manual.is_discovered());
    }
}
