//! Wifi provisioning for a device

use devdock_core::prelude::*;
use devdock_core::Device;
use devdock_probe::WifiConnectResult;

use crate::host::{DeviceProbe, MessageLevel, UserInterface};

/// Scan, pick a network, ask for a password and connect
///
/// The password prompt is only shown for secured networks. Dismissing any
/// prompt returns `Ok(None)`. A device that answers but cannot join is
/// reported to the user and returned; probe failures propagate.
pub async fn configure_wifi<P, U>(
    probe: &P,
    ui: &U,
    device: &Device,
) -> Result<Option<WifiConnectResult>>
where
    P: DeviceProbe + Sync,
    U: UserInterface + Sync,
{
    let networks = probe.wifi_scan(device).await?;
    if networks.is_empty() {
        ui.show_message(
            MessageLevel::Warning,
            &format!("{} found no wifi networks.", device.display_name()),
            &[],
        )
        .await;
        return Ok(None);
    }

    let labels: Vec<String> = networks.iter().map(|n| n.label()).collect();
    let title = format!("Select a wifi network for {}", device.display_name());
    let Some(index) = ui.pick(&title, &labels).await else {
        debug!("Wifi network selection dismissed");
        return Ok(None);
    };
    let Some(network) = networks.get(index) else {
        return Ok(None);
    };

    let password = if network.secured {
        let prompt = format!("Password for {}", network.ssid);
        match ui.input(&prompt, true).await {
            Some(password) => Some(password),
            None => {
                debug!("Wifi password prompt dismissed");
                return Ok(None);
            }
        }
    } else {
        None
    };

    info!("Connecting {} to {}", device.address, network.ssid);
    let result = probe
        .wifi_connect(device, &network.ssid, password.as_deref())
        .await?;

    if result.connected {
        let address = result.address.as_deref().unwrap_or("an unknown address");
        ui.show_message(
            MessageLevel::Info,
            &format!("{} joined {} at {}", device.display_name(), network.ssid, address),
            &[],
        )
        .await;
    } else {
        let reason = result.error.as_deref().unwrap_or("unknown error");
        warn!("Wifi connect to {} failed: {}", network.ssid, reason);
        ui.show_message(
            MessageLevel::Error,
            &format!("Could not join {}: {}", network.ssid, reason),
            &[],
        )
        .await;
    }

    Ok(Some(result))
}
