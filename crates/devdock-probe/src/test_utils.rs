//! Test utilities for probe types
//!
//! Provides helper functions for creating test Device objects and canned
//! probe output.

use devdock_core::{Device, InterfaceKind};

/// Creates a manually registered test device.
pub fn test_manual_device(id: &str, address: &str) -> Device {
    Device::manual(id, address)
}

/// Creates a discovered test device with the given interface kind.
///
/// # Arguments
/// * `kind` - Interface the device was discovered on
/// * `hostname` - Address reported by discovery
pub fn test_discovered_device(kind: InterfaceKind, hostname: &str) -> Device {
    Device::discovered(kind, hostname, None)
}

/// Canned `discover --json` output with one device per interface kind.
pub fn sample_discovery_json() -> &'static str {
    r#"{
        "ethernet": [{"hostname": "kit-eth.local", "displayName": "Ethernet Kit", "agentVersion": "0.4.0"}],
        "usb": [{"hostname": "192.168.7.2", "displayName": "USB Kit"}],
        "lan": [{"hostname": "kit-lan.local"}]
    }"#
}
