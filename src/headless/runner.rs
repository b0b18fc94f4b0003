//! Headless command runner
//!
//! Wires the orchestrators to file-backed stores and a host user interface.
//! Each method backs one CLI subcommand and returns its result for the
//! caller to print.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devdock_app::config::{load_launch_descriptors, Settings};
use devdock_app::{
    configure_wifi, device_cli, load_settings, DebugLaunchDescriptor, DebugSettings, DeviceProbe,
    DeviceRegistry, EventBus, FileDeviceStore, FileLaunchStore, FolderEvent, FsProjectClassifier,
    ManagedFolder, ReadinessCoordinator, SessionDescriptor, SessionResolver, UserInterface,
};
use devdock_core::prelude::*;
use devdock_core::{
    discover_workspace_folders, manifest_targets, target_runtime, Device, FolderContext,
    RunnableTarget, StaticTargets, TargetRuntime, ToolchainContext, ToolchainEvent,
    DEFAULT_MAX_DEPTH,
};
use devdock_probe::{DeviceCli, ToolAvailability, WifiConnectResult};
use tokio::sync::{broadcast, mpsc};

use super::{StaticWorkspace, TerminalUi};

pub struct HeadlessRunner<P, U> {
    root: PathBuf,
    settings: Settings,
    probe: Arc<P>,
    classifier: Arc<FsProjectClassifier>,
    ui: Arc<U>,
    registry: DeviceRegistry<P, FileDeviceStore, U>,
}

impl HeadlessRunner<DeviceCli, TerminalUi> {
    /// Runner backed by the device CLI, the terminal and the user's
    /// devices file (or `devices_path` when given)
    pub fn from_environment(root: PathBuf, devices_path: Option<PathBuf>) -> Result<Self> {
        let settings = load_settings(&root);
        let cli = device_cli(&settings.probe);
        let store = match devices_path {
            Some(path) => FileDeviceStore::new(path),
            None => FileDeviceStore::user_default()?,
        };

        let availability = ToolAvailability::check(cli.command());
        let classifier = match availability.device_cli_unavailable_message() {
            None => FsProjectClassifier::with_cli(cli.clone()),
            Some(message) => {
                warn!("{}", message);
                eprintln!("{}", message);
                FsProjectClassifier::new()
            }
        };

        Ok(Self::new(
            root,
            settings,
            Arc::new(cli),
            classifier,
            store,
            Arc::new(TerminalUi::new()),
        ))
    }
}

impl<P, U> HeadlessRunner<P, U>
where
    P: DeviceProbe + Sync + 'static,
    U: UserInterface + Sync + 'static,
{
    pub fn new(
        root: PathBuf,
        settings: Settings,
        probe: Arc<P>,
        classifier: FsProjectClassifier,
        store: FileDeviceStore,
        ui: Arc<U>,
    ) -> Self {
        let registry = DeviceRegistry::new(
            Arc::clone(&probe),
            Arc::new(store),
            Arc::clone(&ui),
            Arc::new(EventBus::new()),
        );

        Self {
            root,
            settings,
            probe,
            classifier: Arc::new(classifier),
            ui,
            registry,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &DeviceRegistry<P, FileDeviceStore, U> {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────
    // devices
    // ─────────────────────────────────────────────────────────

    /// Refresh the device list; returns it with the current device
    ///
    /// The current device's update check runs before returning so it
    /// completes within the command.
    pub async fn list_devices(&self) -> Result<(Vec<Device>, Option<Device>)> {
        let devices = self.registry.refresh().await?;
        let current = self.registry.current_device().await?;
        if let Some(device) = &current {
            self.registry.check_for_updates_reporting(device).await;
        }
        Ok((devices, current))
    }

    pub async fn add_device(&self, address: &str) -> Result<Device> {
        self.registry.add(address).await
    }

    pub async fn remove_device(&self, specifier: &str) -> Result<Device> {
        let device = self.require_device(specifier).await?;
        self.registry.delete(&device.id).await?;
        Ok(device)
    }

    pub async fn select_device(&self, specifier: &str) -> Result<Device> {
        let device = self.require_device(specifier).await?;
        self.registry.set_current(Some(&device.id)).await?;
        Ok(device)
    }

    async fn require_device(&self, specifier: &str) -> Result<Device> {
        if let Some(device) = self.registry.find(specifier).await? {
            return Ok(device);
        }
        // Not a manual device; look again after discovery
        self.registry.refresh().await?;
        self.registry
            .find(specifier)
            .await?
            .ok_or_else(|| Error::device_not_found(specifier))
    }

    // ─────────────────────────────────────────────────────────
    // configs
    // ─────────────────────────────────────────────────────────

    /// Run the readiness barrier over the workspace and generate launch
    /// configurations
    ///
    /// Folders with a native manifest are reported as toolchain folders
    /// carrying their manifest targets. Once those have been observed the
    /// remaining folders are considered settled.
    pub async fn generate_configs(&self, root_only: bool) -> Result<Vec<ManagedFolder>> {
        let mut folders = if root_only {
            Vec::new()
        } else {
            discover_workspace_folders(&self.root, DEFAULT_MAX_DEPTH)
        };
        if folders.is_empty() {
            folders.push(self.root.clone());
        }
        info!("Generating launch configurations for {} folders", folders.len());

        let native: Vec<PathBuf> = folders
            .iter()
            .filter(|path| target_runtime(path) == TargetRuntime::Native)
            .cloned()
            .collect();

        let coordinator = ReadinessCoordinator::new(
            Arc::new(StaticWorkspace::new(folders)),
            Arc::clone(&self.classifier),
            Arc::new(FileLaunchStore::new()),
            Arc::clone(&self.ui),
            Arc::new(EventBus::new()),
            self.settings.readiness.fallback_timeout(),
        );

        if native.is_empty() {
            coordinator.start(None);
        } else {
            let mut folder_rx = coordinator.events().subscribe_folders();
            let (tx, rx) = mpsc::channel(native.len());
            coordinator.start(Some(rx));

            for path in &native {
                let targets = StaticTargets(manifest_targets(path));
                let event =
                    ToolchainEvent::Add(FolderContext::new(path, ToolchainContext::new(targets)));
                tx.send(event).await.map_err(|_| Error::ChannelClosed)?;
            }
            drop(tx);

            await_observed(&mut folder_rx, native.len()).await;
            coordinator.fire_ready().await;
        }

        coordinator.wait_ready().await;
        Ok(coordinator.folders().await)
    }

    // ─────────────────────────────────────────────────────────
    // debug
    // ─────────────────────────────────────────────────────────

    /// Resolve a debug session for `target` in `folder`
    ///
    /// Uses the folder's stored launch configuration when one matches,
    /// otherwise builds one. `Ok(None)` means a precondition prompt
    /// cancelled the session.
    pub async fn debug_session(
        &self,
        folder: &Path,
        target: Option<&str>,
        script: bool,
    ) -> Result<Option<SessionDescriptor>> {
        let request = self.launch_request(folder, target, script)?;

        if self.registry.current_device().await?.is_none() {
            // The current device may be a discovered one
            self.registry.refresh().await?;
        }

        let resolver = SessionResolver::new(
            self.registry.clone(),
            Arc::clone(&self.ui),
            DebugSettings::from(&self.settings),
        );
        resolver.resolve(folder, &request).await
    }

    fn launch_request(
        &self,
        folder: &Path,
        target: Option<&str>,
        script: bool,
    ) -> Result<DebugLaunchDescriptor> {
        let stored: Vec<DebugLaunchDescriptor> = load_launch_descriptors(folder)
            .with_context(|| format!("Reading launch configurations in {}", folder.display()))?
            .iter()
            .filter_map(|value| DebugLaunchDescriptor::from_value(value).ok())
            .collect();

        if script {
            let found = stored
                .into_iter()
                .find(|d| d.runtime == TargetRuntime::Script);
            return Ok(found.unwrap_or_else(|| DebugLaunchDescriptor::generic_entry(folder)));
        }

        let target = target.ok_or_else(|| {
            Error::config_invalid("a --target is required for native debugging")
        })?;
        let found = stored
            .into_iter()
            .find(|d| d.runtime == TargetRuntime::Native && d.target.as_deref() == Some(target));

        Ok(found.unwrap_or_else(|| {
            DebugLaunchDescriptor::for_target(
                folder,
                &RunnableTarget::new(target),
                TargetRuntime::Native,
            )
        }))
    }

    // ─────────────────────────────────────────────────────────
    // wifi
    // ─────────────────────────────────────────────────────────

    pub async fn configure_wifi(&self, specifier: &str) -> Result<Option<WifiConnectResult>> {
        let device = self.require_device(specifier).await?;
        configure_wifi(self.probe.as_ref(), self.ui.as_ref(), &device).await
    }
}

/// Wait until `expected` folder state events arrived, or readiness fired
async fn await_observed(rx: &mut broadcast::Receiver<FolderEvent>, expected: usize) {
    let mut observed = 0;
    while observed < expected {
        match rx.recv().await {
            Ok(FolderEvent::Added(_)) | Ok(FolderEvent::Updated(_)) => observed += 1,
            Ok(FolderEvent::Ready) => return,
            Ok(FolderEvent::Removed(_)) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Missed {} folder events", skipped);
                observed += skipped as usize;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
