//! Device discovery using the device CLI's `discover --json` command

use devdock_core::prelude::*;
use devdock_core::{Device, InterfaceKind};
use serde::Deserialize;
use std::time::Instant;

use crate::process::{extract_json_object, DeviceCli};

/// A device as reported by the discovery probe
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDevice {
    pub hostname: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub agent_version: Option<String>,
}

/// Discovery probe output, devices grouped by interface kind
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryReport {
    #[serde(default)]
    pub ethernet: Vec<DiscoveredDevice>,

    #[serde(default)]
    pub usb: Vec<DiscoveredDevice>,

    #[serde(default)]
    pub lan: Vec<DiscoveredDevice>,
}

impl DiscoveryReport {
    /// Flatten into domain devices, ordered Ethernet, USB, LAN
    pub fn into_devices(self) -> Vec<Device> {
        let groups = [
            (InterfaceKind::Ethernet, self.ethernet),
            (InterfaceKind::Usb, self.usb),
            (InterfaceKind::Lan, self.lan),
        ];

        groups
            .into_iter()
            .flat_map(|(kind, devices)| {
                devices.into_iter().map(move |d| {
                    Device::discovered(kind, d.hostname, d.display_name)
                        .with_agent_version(d.agent_version)
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ethernet.len() + self.usb.len() + self.lan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse the JSON output of `discover --json`
pub fn parse_discovery_output(output: &str) -> Result<DiscoveryReport> {
    let json = extract_json_object(output)
        .ok_or_else(|| Error::probe_output("No JSON object in discovery output"))?;

    serde_json::from_str(json)
        .map_err(|e| Error::probe_output(format!("Failed to parse discovery output: {}", e)))
}

impl DeviceCli {
    /// Probe the network for devices
    pub async fn discover(&self) -> Result<DiscoveryReport> {
        let start = Instant::now();
        info!("Discovering devices...");

        let output = self.run("discover", &["discover", "--json"]).await?;
        let report = parse_discovery_output(&output.stdout)?;

        info!(
            "Discovered {} devices in {:?}",
            report.len(),
            start.elapsed()
        );
        Ok(report)
    }
}
