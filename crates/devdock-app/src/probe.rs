//! Device CLI as the orchestrator's device probe

use devdock_core::prelude::*;
use devdock_core::Device;
use devdock_probe::{AgentVersion, DeviceCli, WifiConnectResult, WifiNetwork};

use crate::config::ProbeSettings;
use crate::host::DeviceProbe;

/// Build a CLI handle from `[probe]` settings
pub fn device_cli(settings: &ProbeSettings) -> DeviceCli {
    DeviceCli::new(&settings.command).with_timeout(settings.timeout())
}

impl DeviceProbe for DeviceCli {
    async fn discover(&self) -> Result<Vec<Device>> {
        Ok(DeviceCli::discover(self).await?.into_devices())
    }

    async fn agent_version(&self, device: &Device) -> Result<AgentVersion> {
        DeviceCli::agent_version(self, &device.address).await
    }

    async fn update_agent(&self, device: &Device) -> Result<()> {
        DeviceCli::update_agent(self, &device.address).await
    }

    async fn wifi_scan(&self, device: &Device) -> Result<Vec<WifiNetwork>> {
        DeviceCli::wifi_scan(self, &device.address).await
    }

    async fn wifi_connect(
        &self,
        device: &Device,
        ssid: &str,
        password: Option<&str>,
    ) -> Result<WifiConnectResult> {
        DeviceCli::wifi_connect(self, &device.address, ssid, password).await
    }
}
