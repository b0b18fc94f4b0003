//! In-memory collaborators for tests
//!
//! Compiled for unit tests and for downstream crates enabling the
//! `test-helpers` feature.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use devdock_core::prelude::*;
use devdock_core::Device;
use devdock_probe::{AgentVersion, WifiConnectResult, WifiNetwork};
use serde_json::Value;

use crate::config::ManualDevice;
use crate::host::{
    DeviceProbe, DeviceStore, HostCommand, LaunchStore, MessageLevel, ProjectClassifier,
    UserInterface, Workspace,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspace / classifier
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FixedWorkspace {
    folders: Mutex<Vec<PathBuf>>,
}

impl FixedWorkspace {
    pub fn new<I, P>(folders: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            folders: Mutex::new(folders.into_iter().map(Into::into).collect()),
        }
    }

    pub fn set_folders<I, P>(&self, folders: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        *lock(&self.folders) = folders.into_iter().map(Into::into).collect();
    }
}

impl Workspace for FixedWorkspace {
    fn folders(&self) -> Vec<PathBuf> {
        lock(&self.folders).clone()
    }
}

/// Classifier answering from a fixed set of managed paths
#[derive(Debug, Default)]
pub struct FixedClassifier {
    managed: HashSet<PathBuf>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new<I, P>(managed: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            managed: managed.into_iter().map(Into::into).collect(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Suspend for `delay` inside every classification
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProjectClassifier for FixedClassifier {
    async fn is_managed_project(&self, path: &Path) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.managed.contains(path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stores
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryLaunchStore {
    entries: Mutex<HashMap<PathBuf, Vec<Value>>>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
}

impl MemoryLaunchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, folder: impl Into<PathBuf>, descriptors: Vec<Value>) {
        lock(&self.entries).insert(folder.into(), descriptors);
    }

    pub fn descriptors(&self, folder: &Path) -> Vec<Value> {
        lock(&self.entries).get(folder).cloned().unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

impl LaunchStore for MemoryLaunchStore {
    async fn get_launch_descriptors(&self, folder: &Path) -> Result<Vec<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::config_invalid("launch store unreadable"));
        }
        Ok(self.descriptors(folder))
    }

    async fn set_launch_descriptors(&self, folder: &Path, descriptors: Vec<Value>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.insert(folder, descriptors);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    devices: Mutex<Vec<ManualDevice>>,
    current: Mutex<Option<String>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `(id, address)` pairs
    pub fn with_devices(devices: &[(&str, &str)]) -> Self {
        let store = Self::default();
        *lock(&store.devices) = devices
            .iter()
            .map(|(id, address)| ManualDevice {
                id: id.to_string(),
                address: address.to_string(),
            })
            .collect();
        store
    }

    pub fn with_current(self, id: &str) -> Self {
        *lock(&self.current) = Some(id.to_string());
        self
    }

    pub fn stored_devices(&self) -> Vec<ManualDevice> {
        lock(&self.devices).clone()
    }

    pub fn stored_current(&self) -> Option<String> {
        lock(&self.current).clone()
    }
}

impl DeviceStore for MemoryDeviceStore {
    async fn manual_devices(&self) -> Result<Vec<ManualDevice>> {
        Ok(self.stored_devices())
    }

    async fn set_manual_devices(&self, devices: Vec<ManualDevice>) -> Result<()> {
        *lock(&self.devices) = devices;
        Ok(())
    }

    async fn current_device_id(&self) -> Result<Option<String>> {
        Ok(self.stored_current())
    }

    async fn set_current_device_id(&self, id: Option<String>) -> Result<()> {
        *lock(&self.current) = id;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Scriptable device probe with call counters
#[derive(Debug, Default)]
pub struct FakeProbe {
    discovered: Mutex<Vec<Device>>,
    discover_fails: AtomicBool,
    version: Mutex<Option<AgentVersion>>,
    version_delay: Mutex<Option<Duration>>,
    networks: Mutex<Vec<WifiNetwork>>,
    connect_error: Mutex<Option<String>>,
    connect_rejection: Mutex<Option<String>>,
    last_connect: Mutex<Option<(String, Option<String>)>>,
    discover_calls: AtomicUsize,
    version_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discovered(self, devices: Vec<Device>) -> Self {
        *lock(&self.discovered) = devices;
        self
    }

    pub fn failing_discovery(self) -> Self {
        self.discover_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_version(self, current: &str, latest: Option<&str>) -> Self {
        *lock(&self.version) = Some(AgentVersion {
            current: current.to_string(),
            latest: latest.map(String::from),
        });
        self
    }

    pub fn with_version_delay(self, delay: Duration) -> Self {
        *lock(&self.version_delay) = Some(delay);
        self
    }

    pub fn with_networks(self, networks: Vec<WifiNetwork>) -> Self {
        *lock(&self.networks) = networks;
        self
    }

    pub fn failing_connect(self, message: &str) -> Self {
        *lock(&self.connect_error) = Some(message.to_string());
        self
    }

    /// The device answers but reports it could not join
    pub fn rejecting_connect(self, reason: &str) -> Self {
        *lock(&self.connect_rejection) = Some(reason.to_string());
        self
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// SSID and password of the last connect request
    pub fn last_connect(&self) -> Option<(String, Option<String>)> {
        lock(&self.last_connect).clone()
    }
}

impl DeviceProbe for FakeProbe {
    async fn discover(&self) -> Result<Vec<Device>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if self.discover_fails.load(Ordering::SeqCst) {
            return Err(Error::probe_output("No JSON object in discovery output"));
        }
        Ok(lock(&self.discovered).clone())
    }

    async fn agent_version(&self, device: &Device) -> Result<AgentVersion> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.version_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let version = lock(&self.version).clone();
        version.ok_or_else(|| Error::probe(format!("{} did not answer", device.address)))
    }

    async fn update_agent(&self, _device: &Device) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wifi_scan(&self, _device: &Device) -> Result<Vec<WifiNetwork>> {
        Ok(lock(&self.networks).clone())
    }

    async fn wifi_connect(
        &self,
        _device: &Device,
        ssid: &str,
        password: Option<&str>,
    ) -> Result<WifiConnectResult> {
        *lock(&self.last_connect) = Some((ssid.to_string(), password.map(String::from)));
        if let Some(message) = lock(&self.connect_error).clone() {
            return Err(Error::probe(message));
        }
        if let Some(reason) = lock(&self.connect_rejection).clone() {
            return Ok(WifiConnectResult {
                connected: false,
                ssid: Some(ssid.to_string()),
                address: None,
                error: Some(reason),
            });
        }
        Ok(WifiConnectResult {
            connected: true,
            ssid: Some(ssid.to_string()),
            address: Some("10.0.0.99".to_string()),
            error: None,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User interface
// ─────────────────────────────────────────────────────────────────────────────

/// User interface replaying scripted answers; unscripted prompts are dismissed
#[derive(Debug, Default)]
pub struct ScriptedUi {
    messages: Mutex<Vec<(MessageLevel, String)>>,
    actions: Mutex<VecDeque<Option<String>>>,
    inputs: Mutex<VecDeque<Option<String>>>,
    picks: Mutex<VecDeque<Option<usize>>>,
    commands: Mutex<Vec<HostCommand>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next message that offers actions
    pub fn answer_action(self, action: Option<&str>) -> Self {
        lock(&self.actions).push_back(action.map(String::from));
        self
    }

    pub fn answer_input(self, input: Option<&str>) -> Self {
        lock(&self.inputs).push_back(input.map(String::from));
        self
    }

    pub fn answer_pick(self, index: Option<usize>) -> Self {
        lock(&self.picks).push_back(index);
        self
    }

    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        lock(&self.messages).clone()
    }

    pub fn commands(&self) -> Vec<HostCommand> {
        lock(&self.commands).clone()
    }

    /// Prompts passed to `input`, in order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn has_message_containing(&self, text: &str) -> bool {
        lock(&self.messages).iter().any(|(_, m)| m.contains(text))
    }
}

impl UserInterface for ScriptedUi {
    async fn show_message(
        &self,
        level: MessageLevel,
        message: &str,
        actions: &[&str],
    ) -> Option<String> {
        lock(&self.messages).push((level, message.to_string()));
        if actions.is_empty() {
            return None;
        }
        lock(&self.actions).pop_front().flatten()
    }

    async fn input(&self, prompt: &str, _secret: bool) -> Option<String> {
        lock(&self.prompts).push(prompt.to_string());
        lock(&self.inputs).pop_front().flatten()
    }

    async fn pick(&self, _title: &str, items: &[String]) -> Option<usize> {
        lock(&self.picks)
            .pop_front()
            .flatten()
            .filter(|&i| i < items.len())
    }

    async fn execute(&self, command: HostCommand) {
        lock(&self.commands).push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_ui_dismisses_when_unscripted() {
        let ui = ScriptedUi::new().answer_pick(Some(5));
        assert_eq!(ui.input("Name", false).await, None);
        assert_eq!(ui.pick("Pick", &["a".to_string()]).await, None);
        assert_eq!(
            ui.show_message(MessageLevel::Info, "hello", &["Ok"]).await,
            None
        );
        assert!(ui.has_message_containing("hello"));
    }

    #[tokio::test]
    async fn test_fake_probe_counts_calls() {
        let probe = FakeProbe::new().with_version("1.0.0", None);
        let device = Device::manual("a", "10.0.0.1");
        probe.agent_version(&device).await.unwrap();
        probe.update_agent(&device).await.unwrap();
        assert_eq!(probe.version_calls(), 1);
        assert_eq!(probe.update_calls(), 1);
    }
}
