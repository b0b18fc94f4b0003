//! Change notifications for views
//!
//! Three independent broadcast channels: folder changes, device list changes,
//! and current-device changes. Publishing never fails; with no subscribers the
//! event is simply dropped.

use std::path::PathBuf;

use devdock_core::Device;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Folder lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEvent {
    Added(PathBuf),
    Updated(PathBuf),
    Removed(PathBuf),
    /// The workspace became ready
    Ready,
}

#[derive(Debug)]
pub struct EventBus {
    folders: broadcast::Sender<FolderEvent>,
    devices: broadcast::Sender<Vec<Device>>,
    current_device: broadcast::Sender<Option<Device>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (folders, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (devices, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (current_device, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            folders,
            devices,
            current_device,
        }
    }

    pub fn subscribe_folders(&self) -> broadcast::Receiver<FolderEvent> {
        self.folders.subscribe()
    }

    pub fn subscribe_devices(&self) -> broadcast::Receiver<Vec<Device>> {
        self.devices.subscribe()
    }

    pub fn subscribe_current_device(&self) -> broadcast::Receiver<Option<Device>> {
        self.current_device.subscribe()
    }

    pub fn publish_folder(&self, event: FolderEvent) {
        let _ = self.folders.send(event);
    }

    pub fn publish_devices(&self, devices: Vec<Device>) {
        let _ = self.devices.send(devices);
    }

    pub fn publish_current_device(&self, device: Option<Device>) {
        let _ = self.current_device.send(device);
    }
}
