//! # devdock-probe - Device CLI Probes
//!
//! Runs the device command-line tool (`devdockctl` by default) as a child
//! process and parses its `--json` output. Every probe is a one-shot process
//! invocation bounded by a timeout.
//!
//! Depends on [`devdock_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Invocation
//! - [`DeviceCli`] - Configured handle for the device CLI
//! - [`ProbeOutput`] - Captured stdout/stderr of one invocation
//!
//! ### Device Discovery
//! - [`DiscoveryReport`] - Devices grouped by interface kind
//! - [`parse_discovery_output()`] - Parse `discover --json` output
//!
//! ### Agent Operations
//! - [`AgentVersion`] - Current and latest available agent version
//! - [`WifiNetwork`] - A network visible to the device
//!
//! ### Tool Lookup
//! - [`ToolAvailability`] - Whether the device CLI is on `PATH`

pub mod agent;
pub mod devices;
pub mod process;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tool_availability;

pub use agent::{
    parse_connect_output, parse_version_output, parse_wifi_scan_output, AgentVersion,
    WifiConnectResult, WifiNetwork,
};
pub use devices::{parse_discovery_output, DiscoveredDevice, DiscoveryReport};
pub use process::{DeviceCli, ProbeOutput, DEFAULT_PROBE_COMMAND, DEFAULT_PROBE_TIMEOUT};
pub use tool_availability::ToolAvailability;
