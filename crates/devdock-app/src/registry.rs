//! Device registry
//!
//! Merges persisted manual devices with the latest discovery results, owns
//! the current-device selection, and makes sure each device gets at most one
//! update check per process.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use devdock_core::prelude::*;
use devdock_core::Device;
use uuid::Uuid;

use crate::config::ManualDevice;
use crate::events::EventBus;
use crate::host::{DeviceProbe, DeviceStore, MessageLevel, UserInterface};

const UPDATE_ACTION: &str = "Update";

/// Outcome of an update check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCheck {
    /// The device was already checked this session
    AlreadyChecked,
    UpToDate,
    /// A newer agent exists but the user did not accept the update
    Declined,
    Updated,
}

struct Inner<P, S, U> {
    probe: Arc<P>,
    store: Arc<S>,
    ui: Arc<U>,
    bus: Arc<EventBus>,
    /// Result of the most recent successful discovery
    discovered: tokio::sync::Mutex<Vec<Device>>,
    /// Process lifetime only; ids are never removed
    checked_for_updates: Mutex<HashSet<String>>,
}

pub struct DeviceRegistry<P, S, U> {
    inner: Arc<Inner<P, S, U>>,
}

impl<P, S, U> Clone for DeviceRegistry<P, S, U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P, S, U> DeviceRegistry<P, S, U>
where
    P: DeviceProbe + Sync + 'static,
    S: DeviceStore + Sync + 'static,
    U: UserInterface + Sync + 'static,
{
    pub fn new(probe: Arc<P>, store: Arc<S>, ui: Arc<U>, bus: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(Inner {
                probe,
                store,
                ui,
                bus,
                discovered: tokio::sync::Mutex::new(Vec::new()),
                checked_for_updates: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Manual devices followed by freshly discovered ones
    ///
    /// Discovery failures are logged and the manual devices are returned
    /// alone. When a current device is selected, an update check for it is
    /// started in the background.
    pub async fn list(&self) -> Result<Vec<Device>> {
        let devices = self.refresh().await?;

        if let Some(current) = self.current_in(&devices).await? {
            self.spawn_update_check(current);
        }

        Ok(devices)
    }

    /// Like [`list`](Self::list), without starting the update check
    ///
    /// Callers that outlive only a single command await
    /// [`check_for_updates_reporting`](Self::check_for_updates_reporting)
    /// themselves.
    pub async fn refresh(&self) -> Result<Vec<Device>> {
        let manual = self.manual_devices().await?;

        match self.inner.probe.discover().await {
            Ok(found) => {
                debug!("Discovery returned {} devices", found.len());
                *self.inner.discovered.lock().await = found;
            }
            Err(e) => {
                warn!("Device discovery failed, using manual devices only: {}", e);
                self.inner.discovered.lock().await.clear();
            }
        }

        let mut devices = manual;
        devices.extend(self.inner.discovered.lock().await.iter().cloned());
        self.inner.bus.publish_devices(devices.clone());
        Ok(devices)
    }

    /// Manual devices plus the last discovery result, without probing
    pub async fn known_devices(&self) -> Result<Vec<Device>> {
        let mut devices = self.manual_devices().await?;
        devices.extend(self.inner.discovered.lock().await.iter().cloned());
        Ok(devices)
    }

    async fn manual_devices(&self) -> Result<Vec<Device>> {
        Ok(self
            .inner
            .store
            .manual_devices()
            .await?
            .iter()
            .map(ManualDevice::to_device)
            .collect())
    }

    /// Register a device by address
    ///
    /// The first device ever added becomes the current device.
    pub async fn add(&self, address: &str) -> Result<Device> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::config_invalid("Device address cannot be empty"));
        }

        let mut manual = self.inner.store.manual_devices().await?;
        if manual.iter().any(|d| d.address == address) {
            return Err(Error::duplicate_device(address));
        }

        let first = manual.is_empty();
        let entry = ManualDevice {
            id: Uuid::new_v4().to_string(),
            address: address.to_string(),
        };
        let device = entry.to_device();
        manual.push(entry);
        self.inner.store.set_manual_devices(manual).await?;
        info!("Added device {} ({})", device.address, device.id);

        self.inner.bus.publish_devices(self.known_devices().await?);

        if first {
            self.set_current(Some(&device.id)).await?;
        }

        Ok(device)
    }

    /// Remove a manual device
    ///
    /// Removing the current device selects the first remaining manual
    /// device, or clears the selection when none remain.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut manual = self.inner.store.manual_devices().await?;
        let index = manual
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::device_not_found(id))?;

        let removed = manual.remove(index);
        let next = manual.first().cloned();
        self.inner.store.set_manual_devices(manual).await?;
        info!("Removed device {} ({})", removed.address, removed.id);

        if self.inner.store.current_device_id().await?.as_deref() == Some(id) {
            self.inner
                .store
                .set_current_device_id(next.as_ref().map(|d| d.id.clone()))
                .await?;
            self.inner
                .bus
                .publish_current_device(next.as_ref().map(ManualDevice::to_device));
        }

        self.inner.bus.publish_devices(self.known_devices().await?);
        Ok(())
    }

    /// Select the current device, or clear the selection with `None`
    ///
    /// Selecting a device runs its update check; failures of that check are
    /// reported to the user and do not fail the selection.
    pub async fn set_current(&self, id: Option<&str>) -> Result<Option<Device>> {
        let Some(id) = id else {
            self.inner.store.set_current_device_id(None).await?;
            self.inner.bus.publish_current_device(None);
            return Ok(None);
        };

        let device = self
            .known_devices()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::device_not_found(id))?;

        self.inner
            .store
            .set_current_device_id(Some(device.id.clone()))
            .await?;
        info!("Current device: {}", device.display_name());
        self.inner.bus.publish_current_device(Some(device.clone()));

        self.check_for_updates_reporting(&device).await;
        Ok(Some(device))
    }

    /// The selected device, if it is among the known devices
    pub async fn current_device(&self) -> Result<Option<Device>> {
        let devices = self.known_devices().await?;
        self.current_in(&devices).await
    }

    async fn current_in(&self, devices: &[Device]) -> Result<Option<Device>> {
        let Some(id) = self.inner.store.current_device_id().await? else {
            return Ok(None);
        };

        let current = devices.iter().find(|d| d.id == id).cloned();
        if current.is_none() {
            debug!("Current device {} is not among known devices", id);
        }
        Ok(current)
    }

    /// Look up a known device by id, address, or name
    pub async fn find(&self, specifier: &str) -> Result<Option<Device>> {
        Ok(self
            .known_devices()
            .await?
            .into_iter()
            .find(|d| d.matches(specifier)))
    }

    /// Offer an agent update for `device`, at most once per process
    ///
    /// The device is marked as checked before the version query so that
    /// concurrent calls issue a single query.
    pub async fn check_for_updates(&self, device: &Device) -> Result<UpdateCheck> {
        if !lock(&self.inner.checked_for_updates).insert(device.id.clone()) {
            trace!("{} already checked for updates", device.id);
            return Ok(UpdateCheck::AlreadyChecked);
        }

        let version = self.inner.probe.agent_version(device).await?;
        if !version.has_update() {
            debug!("{} agent {} is up to date", device.name, version.current);
            return Ok(UpdateCheck::UpToDate);
        }

        let message = format!(
            "{} runs agent {}. Version {} is available.",
            device.name,
            version.current,
            version.latest.as_deref().unwrap_or_default()
        );
        let choice = self
            .inner
            .ui
            .show_message(MessageLevel::Info, &message, &[UPDATE_ACTION])
            .await;

        if choice.as_deref() != Some(UPDATE_ACTION) {
            return Ok(UpdateCheck::Declined);
        }

        self.inner.probe.update_agent(device).await?;
        self.inner
            .ui
            .show_message(
                MessageLevel::Info,
                &format!("Updated agent on {}", device.name),
                &[],
            )
            .await;
        Ok(UpdateCheck::Updated)
    }

    /// Run the update check, reporting failures to the user
    pub async fn check_for_updates_reporting(&self, device: &Device) {
        if let Err(e) = self.check_for_updates(device).await {
            warn!("Update check for {} failed: {}", device.id, e);
            self.inner
                .ui
                .show_message(
                    MessageLevel::Error,
                    &format!("Could not check {} for updates: {}", device.name, e),
                    &[],
                )
                .await;
        }
    }

    fn spawn_update_check(&self, device: Device) {
        let this = self.clone();
        tokio::spawn(async move { this.check_for_updates_reporting(&device).await });
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProbe, MemoryDeviceStore, ScriptedUi};
    use devdock_core::InterfaceKind;
    use devdock_probe::test_utils::test_discovered_device;
    use std::time::Duration;

    type TestRegistry = DeviceRegistry<FakeProbe, MemoryDeviceStore, ScriptedUi>;

    fn registry(
        probe: FakeProbe,
        store: MemoryDeviceStore,
        ui: ScriptedUi,
    ) -> (TestRegistry, Arc<FakeProbe>, Arc<MemoryDeviceStore>, Arc<ScriptedUi>) {
        let probe = Arc::new(probe);
        let store = Arc::new(store);
        let ui = Arc::new(ui);
        let registry = DeviceRegistry::new(
            Arc::clone(&probe),
            Arc::clone(&store),
            Arc::clone(&ui),
            Arc::new(EventBus::new()),
        );
        (registry, probe, store, ui)
    }

    fn lan(hostname: &str) -> Device {
        test_discovered_device(InterfaceKind::Lan, hostname)
    }

    async fn settle(mut done: impl FnMut() -> bool) {
        for _ in 0..50 {
            if done() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_list_merges_manual_then_discovered() {
        let (registry, _, _, _) = registry(
            FakeProbe::new().with_discovered(vec![lan("kit.local")]),
            MemoryDeviceStore::with_devices(&[("m1", "kit.local")]),
            ScriptedUi::new(),
        );

        let devices = registry.list().await.unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        // Same address from both origins stays as two entries
        assert_eq!(ids, vec!["m1", "lan:kit.local"]);
    }

    #[tokio::test]
    async fn test_list_falls_back_to_manual_on_discovery_failure() {
        let (registry, probe, _, _) = registry(
            FakeProbe::new().failing_discovery(),
            MemoryDeviceStore::with_devices(&[("m1", "10.0.0.1")]),
            ScriptedUi::new(),
        );

        let devices = registry.list().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(probe.discover_calls(), 1);
    }

    #[tokio::test]
    async fn test_list_publishes_and_checks_current_device() {
        let (registry, probe, _, _) = registry(
            FakeProbe::new().with_version("1.0.0", Some("1.0.0")),
            MemoryDeviceStore::with_devices(&[("m1", "10.0.0.1")]).with_current("m1"),
            ScriptedUi::new(),
        );
        let mut devices_rx = registry.events().subscribe_devices();

        registry.list().await.unwrap();
        assert_eq!(devices_rx.recv().await.unwrap().len(), 1);

        settle(|| probe.version_calls() == 1).await;
        assert_eq!(probe.version_calls(), 1);

        registry.list().await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(probe.version_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_leaves_update_check_to_caller() {
        let (registry, probe, _, ui) = registry(
            FakeProbe::new().with_version("1.0.0", Some("2.0.0")),
            MemoryDeviceStore::with_devices(&[("m1", "10.0.0.1")]).with_current("m1"),
            ScriptedUi::new().answer_action(Some(UPDATE_ACTION)),
        );

        registry.refresh().await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(probe.version_calls(), 0);

        let current = registry.current_device().await.unwrap().unwrap();
        registry.check_for_updates_reporting(&current).await;
        assert_eq!(probe.version_calls(), 1);
        assert_eq!(probe.update_calls(), 1);
        assert!(ui.has_message_containing("Updated agent"));
    }

    #[tokio::test]
    async fn test_list_reports_background_check_failure() {
        let (registry, _, _, ui) = registry(
            FakeProbe::new(),
            MemoryDeviceStore::with_devices(&[("m1", "10.0.0.1")]).with_current("m1"),
            ScriptedUi::new(),
        );

        assert!(registry.list().await.is_ok());
        settle(|| ui.has_message_containing("Could not check")).await;
        assert!(ui.has_message_containing("did not answer"));
    }

    #[tokio::test]
    async fn test_add_duplicate_rejected() {
        let (registry, _, store, _) =
            registry(FakeProbe::new(), MemoryDeviceStore::new(), ScriptedUi::new());

        registry.add("host1").await.unwrap();
        let err = registry.add("host1").await.unwrap_err();

        assert!(matches!(err, Error::DuplicateDevice { .. }));
        assert_eq!(store.stored_devices().len(), 1);
    }

    #[tokio::test]
    async fn test_add_empty_rejected() {
        let (registry, _, store, _) =
            registry(FakeProbe::new(), MemoryDeviceStore::new(), ScriptedUi::new());
        assert!(registry.add("   ").await.is_err());
        assert!(store.stored_devices().is_empty());
    }

    #[tokio::test]
    async fn test_first_added_device_becomes_current() {
        let (registry, _, store, ui) = registry(
            FakeProbe::new().with_version("1.0.0", None),
            MemoryDeviceStore::new(),
            ScriptedUi::new(),
        );

        let first = registry.add("10.0.0.1").await.unwrap();
        let second = registry.add("10.0.0.2:2222").await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.stored_current().as_deref(), Some(first.id.as_str()));
        assert_eq!(second.interface, InterfaceKind::Manual);
        assert!(ui.messages().is_empty());
    }

    #[tokio::test]
    async fn test_delete_current_selects_next() {
        let (registry, _, store, _) = registry(
            FakeProbe::new(),
            MemoryDeviceStore::with_devices(&[("a", "10.0.0.1"), ("b", "10.0.0.2")])
                .with_current("a"),
            ScriptedUi::new(),
        );
        let mut current_rx = registry.events().subscribe_current_device();

        registry.delete("a").await.unwrap();
        assert_eq!(store.stored_current().as_deref(), Some("b"));
        assert_eq!(current_rx.recv().await.unwrap().unwrap().id, "b");

        registry.delete("b").await.unwrap();
        assert_eq!(store.stored_current(), None);
        assert!(store.stored_devices().is_empty());
    }

    #[tokio::test]
    async fn test_delete_non_current_keeps_selection() {
        let (registry, _, store, _) = registry(
            FakeProbe::new(),
            MemoryDeviceStore::with_devices(&[("a", "10.0.0.1"), ("b", "10.0.0.2")])
                .with_current("a"),
            ScriptedUi::new(),
        );

        registry.delete("b").await.unwrap();
        assert_eq!(store.stored_current().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let (registry, _, _, _) = registry(
            FakeProbe::new(),
            MemoryDeviceStore::with_devices(&[("a", "10.0.0.1")]),
            ScriptedUi::new(),
        );
        let err = registry.delete("zzz").await.unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_current_validates_and_checks() {
        let (registry, probe, store, ui) = registry(
            FakeProbe::new()
                .with_discovered(vec![lan("kit.local")])
                .with_version("1.0.0", Some("1.1.0")),
            MemoryDeviceStore::new(),
            ScriptedUi::new().answer_action(Some("Update")),
        );

        let err = registry.set_current(Some("lan:kit.local")).await.unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound { .. }));

        registry.list().await.unwrap();
        let device = registry.set_current(Some("lan:kit.local")).await.unwrap();

        assert_eq!(device.unwrap().address, "kit.local");
        assert_eq!(store.stored_current().as_deref(), Some("lan:kit.local"));
        assert_eq!(probe.version_calls(), 1);
        assert_eq!(probe.update_calls(), 1);
        assert!(ui.has_message_containing("Version 1.1.0 is available"));

        registry.set_current(None).await.unwrap();
        assert_eq!(store.stored_current(), None);
    }

    #[tokio::test]
    async fn test_set_current_survives_check_failure() {
        let (registry, _, store, ui) = registry(
            FakeProbe::new(),
            MemoryDeviceStore::with_devices(&[("a", "10.0.0.1")]),
            ScriptedUi::new(),
        );

        let device = registry.set_current(Some("a")).await.unwrap();
        assert!(device.is_some());
        assert_eq!(store.stored_current().as_deref(), Some("a"));
        assert!(ui
            .messages()
            .iter()
            .any(|(level, _)| *level == MessageLevel::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_checks_query_once() {
        let (registry, probe, _, _) = registry(
            FakeProbe::new()
                .with_version("1.0.0", Some("1.0.0"))
                .with_version_delay(Duration::from_millis(100)),
            MemoryDeviceStore::new(),
            ScriptedUi::new(),
        );
        let device = Device::manual("a", "10.0.0.1");

        let (first, second) = tokio::join!(
            registry.check_for_updates(&device),
            registry.check_for_updates(&device),
        );

        assert_eq!(probe.version_calls(), 1);
        let outcomes = [first.unwrap(), second.unwrap()];
        assert!(outcomes.contains(&UpdateCheck::UpToDate));
        assert!(outcomes.contains(&UpdateCheck::AlreadyChecked));
    }

    #[tokio::test]
    async fn test_declined_update_is_not_retried() {
        let (registry, probe, _, _) = registry(
            FakeProbe::new().with_version("v1.0.0", Some("v2.0.0")),
            MemoryDeviceStore::new(),
            ScriptedUi::new(),
        );
        let device = Device::manual("a", "10.0.0.1");

        assert_eq!(
            registry.check_for_updates(&device).await.unwrap(),
            UpdateCheck::Declined
        );
        assert_eq!(
            registry.check_for_updates(&device).await.unwrap(),
            UpdateCheck::AlreadyChecked
        );
        assert_eq!(probe.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_check_still_counts_as_checked() {
        let (registry, probe, _, _) =
            registry(FakeProbe::new(), MemoryDeviceStore::new(), ScriptedUi::new());
        let device = Device::manual("a", "10.0.0.1");

        assert!(registry.check_for_updates(&device).await.is_err());
        assert_eq!(
            registry.check_for_updates(&device).await.unwrap(),
            UpdateCheck::AlreadyChecked
        );
        assert_eq!(probe.version_calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_current_id_is_absent() {
        let (registry, _, _, _) = registry(
            FakeProbe::new(),
            MemoryDeviceStore::with_devices(&[("a", "10.0.0.1")]).with_current("gone"),
            ScriptedUi::new(),
        );
        assert!(registry.current_device().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_specifier() {
        let (registry, _, _, _) = registry(
            FakeProbe::new().with_discovered(vec![Device::discovered(
                InterfaceKind::Usb,
                "192.168.7.2",
                Some("Bench Kit".to_string()),
            )]),
            MemoryDeviceStore::with_devices(&[("a", "10.0.0.1")]),
            ScriptedUi::new(),
        );
        registry.list().await.unwrap();

        assert_eq!(registry.find("a").await.unwrap().unwrap().address, "10.0.0.1");
        assert_eq!(
            registry.find("bench kit").await.unwrap().unwrap().id,
            "usb:192.168.7.2"
        );
        assert!(registry.find("nope").await.unwrap().is_none());
    }
}
