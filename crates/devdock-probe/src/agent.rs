//! Remote agent operations: version check, update, wifi scan and connect

use devdock_core::prelude::*;
use serde::Deserialize;

use crate::process::{extract_json_object, DeviceCli};

/// Agent version reported by a device
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentVersion {
    /// Version running on the device
    pub current: String,

    /// Latest version available for the device, if known
    #[serde(default)]
    pub latest: Option<String>,
}

impl AgentVersion {
    /// Whether `latest` is newer than `current`
    ///
    /// Versions are compared as semver when both parse; otherwise any
    /// difference counts as an update.
    pub fn has_update(&self) -> bool {
        let Some(latest) = self.latest.as_deref() else {
            return false;
        };

        let parse = |v: &str| semver::Version::parse(v.trim_start_matches('v'));
        match (parse(&self.current), parse(latest)) {
            (Ok(current), Ok(latest)) => latest > current,
            _ => latest != self.current,
        }
    }
}

/// A wifi network visible to the device
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,

    /// Signal strength in dBm
    #[serde(default)]
    pub signal: Option<i32>,

    #[serde(default)]
    pub secured: bool,
}

impl WifiNetwork {
    pub fn label(&self) -> String {
        let lock = if self.secured { " (secured)" } else { "" };
        match self.signal {
            Some(signal) => format!("{} {} dBm{}", self.ssid, signal, lock),
            None => format!("{}{}", self.ssid, lock),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WifiScanOutput {
    #[serde(default)]
    networks: Vec<WifiNetwork>,
}

/// Result of a wifi connect request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WifiConnectResult {
    pub connected: bool,

    #[serde(default)]
    pub ssid: Option<String>,

    /// Address the device obtained on the new network
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

fn parse_json<'a, T: Deserialize<'a>>(output: &'a str, what: &str) -> Result<T> {
    let json = extract_json_object(output)
        .ok_or_else(|| Error::probe_output(format!("No JSON object in {} output", what)))?;
    serde_json::from_str(json)
        .map_err(|e| Error::probe_output(format!("Failed to parse {} output: {}", what, e)))
}

/// Parse the JSON output of `device version --json`
pub fn parse_version_output(output: &str) -> Result<AgentVersion> {
    parse_json(output, "version")
}

/// Parse the JSON output of `device wifi scan --json`, strongest signal first
pub fn parse_wifi_scan_output(output: &str) -> Result<Vec<WifiNetwork>> {
    let mut networks = parse_json::<WifiScanOutput>(output, "wifi scan")?.networks;
    networks.sort_by_key(|n| std::cmp::Reverse(n.signal.unwrap_or(i32::MIN)));
    Ok(networks)
}

/// Parse the JSON output of `device wifi connect --json`
///
/// `connected: false` is a valid answer; the caller decides how to report it.
pub fn parse_connect_output(output: &str) -> Result<WifiConnectResult> {
    parse_json(output, "wifi connect")
}

impl DeviceCli {
    /// Query the agent's current and latest available version
    pub async fn agent_version(&self, address: &str) -> Result<AgentVersion> {
        let output = self
            .run(
                "device version",
                &["device", "version", "--device", address, "--json"],
            )
            .await?;
        parse_version_output(&output.stdout)
    }

    /// Update the agent on the device to the latest version
    pub async fn update_agent(&self, address: &str) -> Result<()> {
        info!("Updating agent on {}", address);
        self.run("device update", &["device", "update", "--device", address])
            .await?;
        Ok(())
    }

    /// List wifi networks visible to the device
    pub async fn wifi_scan(&self, address: &str) -> Result<Vec<WifiNetwork>> {
        let output = self
            .run(
                "wifi scan",
                &["device", "wifi", "scan", "--device", address, "--json"],
            )
            .await?;
        parse_wifi_scan_output(&output.stdout)
    }

    /// Join the device to a wifi network
    pub async fn wifi_connect(
        &self,
        address: &str,
        ssid: &str,
        password: Option<&str>,
    ) -> Result<WifiConnectResult> {
        let mut args = vec![
            "device", "wifi", "connect", "--device", address, "--ssid", ssid, "--json",
        ];
        // The password goes over stdin, never argv
        if password.is_some() {
            args.push("--password-stdin");
        }
        let output = self.run_with_input("wifi connect", &args, password).await?;
        parse_connect_output(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(current: &str, latest: Option<&str>) -> AgentVersion {
        AgentVersion {
            current: current.to_string(),
            latest: latest.map(String::from),
        }
    }

    #[test]
    fn test_parse_version_output() {
        let v = parse_version_output(r#"{"current": "0.4.2", "latest": "0.5.0"}"#).unwrap();
        assert_eq!(v, version("0.4.2", Some("0.5.0")));

        let v = parse_version_output(r#"{"current": "0.4.2"}"#).unwrap();
        assert_eq!(v.latest, None);
    }

    #[test]
    fn test_has_update_semver() {
        assert!(version("0.4.2", Some("0.5.0")).has_update());
        assert!(version("v0.4.2", Some("v0.4.10")).has_update());
        assert!(!version("0.5.0", Some("0.5.0")).has_update());
        assert!(!version("0.6.0", Some("0.5.0")).has_update());
        assert!(!version("0.5.0", None).has_update());
    }

    #[test]
    fn test_has_update_non_semver_falls_back_to_inequality() {
        assert!(version("2024.1", Some("2024.2")).has_update());
        assert!(!version("nightly", Some("nightly")).has_update());
    }

    #[test]
    fn test_parse_wifi_scan_sorted_by_signal() {
        let networks = parse_wifi_scan_output(
            r#"{"networks": [
                {"ssid": "Far", "signal": -80, "secured": true},
                {"ssid": "Unknown"},
                {"ssid": "Near", "signal": -40}
            ]}"#,
        )
        .unwrap();

        let ssids: Vec<_> = networks.iter().map(|n| n.ssid.as_str()).collect();
        assert_eq!(ssids, vec!["Near", "Far", "Unknown"]);
        assert_eq!(networks[1].label(), "Far -80 dBm (secured)");
        assert_eq!(networks[2].label(), "Unknown");
    }

    #[test]
    fn test_parse_connect_output() {
        let ok = parse_connect_output(
            r#"{"connected": true, "ssid": "Home", "address": "10.0.0.9"}"#,
        )
        .unwrap();
        assert_eq!(ok.address.as_deref(), Some("10.0.0.9"));

        let rejected =
            parse_connect_output(r#"{"connected": false, "error": "bad password"}"#).unwrap();
        assert!(!rejected.connected);
        assert_eq!(rejected.error.as_deref(), Some("bad password"));

        assert!(parse_connect_output("Joining...").is_err());
    }
}
