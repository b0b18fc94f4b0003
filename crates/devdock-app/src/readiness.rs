//! Workspace readiness barrier
//!
//! The coordinator tracks one [`ManagedFolder`] per workspace folder and
//! decides, exactly once, that the initial folder set has been observed.
//! Two triggers race for the barrier:
//!
//! - every folder in the initial snapshot has produced a state-carrying
//!   toolchain event (`add` or one of the `*Updated` operations)
//! - the fallback timer expired
//!
//! Both write to the same [`OnceLatch`], so whichever trigger wins runs the
//! downstream work and the other becomes a no-op. Without a toolchain event
//! stream the barrier fires immediately.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use devdock_core::prelude::*;
use devdock_core::{Classification, FolderContext, ToolchainEvent};
use tokio::sync::{mpsc, oneshot, watch};

use crate::events::{EventBus, FolderEvent};
use crate::folder::ManagedFolder;
use crate::host::{
    HostCommand, LaunchStore, MessageLevel, ProjectClassifier, UserInterface, Workspace,
};
use crate::synthesizer::ConfigSynthesizer;

/// Default upper bound on waiting for toolchain events
pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

const RELOAD_ACTION: &str = "Reload";
const REFRESH_ACTION: &str = "Refresh";

/// One-shot flag: the first `try_fire` wins, every later call returns false
#[derive(Debug, Default)]
pub struct OnceLatch(AtomicBool);

impl OnceLatch {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Returns true for exactly one caller
    pub fn try_fire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_fired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct CoordinatorState {
    folders: HashMap<PathBuf, ManagedFolder>,
    /// Grows monotonically
    processed: HashSet<PathBuf>,
    focused: Option<PathBuf>,
}

struct Inner<W, C, L, U> {
    workspace: Arc<W>,
    classifier: Arc<C>,
    ui: Arc<U>,
    synthesizer: ConfigSynthesizer<L>,
    bus: Arc<EventBus>,
    /// Snapshot taken at construction, never mutated
    initial_folder_paths: HashSet<PathBuf>,
    state: tokio::sync::Mutex<CoordinatorState>,
    ready: OnceLatch,
    generated: OnceLatch,
    /// Flips to true once the barrier fired and the generation pass finished
    ready_tx: watch::Sender<bool>,
    fallback_cancel: Mutex<Option<oneshot::Sender<()>>>,
    in_flight: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    fallback_timeout: Duration,
}

/// Owns per-folder state and the one-shot "folders ready" barrier
///
/// Cheap to clone; clones share state.
pub struct ReadinessCoordinator<W, C, L, U> {
    inner: Arc<Inner<W, C, L, U>>,
}

impl<W, C, L, U> Clone for ReadinessCoordinator<W, C, L, U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<W, C, L, U> ReadinessCoordinator<W, C, L, U>
where
    W: Workspace + 'static,
    C: ProjectClassifier + Sync + 'static,
    L: LaunchStore + Sync + 'static,
    U: UserInterface + Sync + 'static,
{
    /// Snapshot the host's current folders as the initial set
    pub fn new(
        workspace: Arc<W>,
        classifier: Arc<C>,
        launch_store: Arc<L>,
        ui: Arc<U>,
        bus: Arc<EventBus>,
        fallback_timeout: Duration,
    ) -> Self {
        let initial_folder_paths: HashSet<PathBuf> = workspace.folders().into_iter().collect();
        debug!(
            "Readiness coordinator created with {} initial folders",
            initial_folder_paths.len()
        );

        let (ready_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                workspace,
                classifier,
                ui,
                synthesizer: ConfigSynthesizer::new(launch_store),
                bus,
                initial_folder_paths,
                state: tokio::sync::Mutex::new(CoordinatorState::default()),
                ready: OnceLatch::new(),
                generated: OnceLatch::new(),
                ready_tx,
                fallback_cancel: Mutex::new(None),
                in_flight: Mutex::new(HashMap::new()),
                fallback_timeout,
            }),
        }
    }

    /// Begin consuming toolchain events
    ///
    /// `None` means there is no toolchain integration at all, and the barrier
    /// fires right away. Otherwise the fallback timer is armed and events are
    /// handled in delivery order on a background task.
    pub fn start(&self, events: Option<mpsc::Receiver<ToolchainEvent>>) {
        let Some(mut events) = events else {
            info!("No toolchain event stream, workspace is ready");
            let this = self.clone();
            tokio::spawn(async move { this.fire_ready().await });
            return;
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        *lock(&self.inner.fallback_cancel) = Some(cancel_tx);

        let timer = self.clone();
        let timeout = self.inner.fallback_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    info!("Toolchain events incomplete after {:?}, forcing readiness", timeout);
                    timer.fire_ready().await;
                }
                _ = cancel_rx => {
                    trace!("Fallback timer cancelled");
                }
            }
        });

        let this = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                this.handle_event(event).await;
            }
            debug!("Toolchain event stream closed");
        });
    }

    /// Apply one toolchain event
    pub async fn handle_event(&self, event: ToolchainEvent) {
        trace!("Toolchain event {} for {:?}", event.operation(), event.path());

        match event {
            ToolchainEvent::Add(folder) => self.on_folder_state(folder, true).await,
            ToolchainEvent::PackageUpdated(folder)
            | ToolchainEvent::ResolvedUpdated(folder)
            | ToolchainEvent::WorkspaceStateUpdated(folder)
            | ToolchainEvent::PluginsUpdated(folder) => self.on_folder_state(folder, false).await,
            ToolchainEvent::Remove(path) => self.on_folder_removed(path).await,
            ToolchainEvent::Focus(path) => {
                self.inner.state.lock().await.focused = Some(path);
            }
            ToolchainEvent::Unfocus(path) => {
                let mut state = self.inner.state.lock().await;
                if state.focused.as_deref() == Some(path.as_path()) {
                    state.focused = None;
                }
            }
        }
    }

    fn folder_guard(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = lock(&self.inner.in_flight);
        Arc::clone(in_flight.entry(path.to_path_buf()).or_default())
    }

    async fn on_folder_state(&self, context: FolderContext, added: bool) {
        let FolderContext { path, toolchain } = context;

        let all_initial_processed = {
            let guard = self.folder_guard(&path);
            let _held = guard.lock().await;

            let needs_classification = {
                let mut state = self.inner.state.lock().await;
                let folder = state
                    .folders
                    .entry(path.clone())
                    .or_insert_with(|| ManagedFolder::new(&path, None));
                folder.toolchain = Some(toolchain);
                folder.needs_classification()
            };

            if needs_classification {
                let managed = self.inner.classifier.is_managed_project(&path).await;
                debug!("Classified {:?}: managed={}", path, managed);
                if let Some(folder) = self.inner.state.lock().await.folders.get_mut(&path) {
                    folder.classification = Classification::from(managed);
                }
            }

            let mut state = self.inner.state.lock().await;
            state.processed.insert(path.clone());
            self.inner.initial_folder_paths.contains(&path)
                && self.inner.initial_folder_paths.is_subset(&state.processed)
        };

        self.inner.bus.publish_folder(if added {
            FolderEvent::Added(path)
        } else {
            FolderEvent::Updated(path)
        });

        if all_initial_processed {
            debug!("All initial folders processed");
            self.fire_ready().await;
        }
    }

    async fn on_folder_removed(&self, path: PathBuf) {
        let removed = {
            let mut state = self.inner.state.lock().await;
            if state.folders.len() <= 1 && state.folders.contains_key(&path) {
                debug!("Keeping {:?}: it is the only known folder", path);
                false
            } else {
                state.folders.remove(&path).is_some()
            }
        };

        if !removed {
            return;
        }

        info!("Folder removed: {:?}", path);
        self.inner.bus.publish_folder(FolderEvent::Removed(path));

        let ui = Arc::clone(&self.inner.ui);
        tokio::spawn(async move {
            let choice = ui
                .show_message(
                    MessageLevel::Info,
                    "Workspace folders changed. Refresh the device views?",
                    &[REFRESH_ACTION],
                )
                .await;
            if choice.as_deref() == Some(REFRESH_ACTION) {
                ui.execute(HostCommand::RefreshViews).await;
            }
        });
    }

    /// Fire the barrier; only the first call has any effect
    pub async fn fire_ready(&self) {
        if !self.inner.ready.try_fire() {
            return;
        }

        let cancel = lock(&self.inner.fallback_cancel).take();
        if let Some(cancel) = cancel {
            let _ = cancel.send(());
        }

        info!("Workspace folders ready");
        self.inner.bus.publish_folder(FolderEvent::Ready);

        if self.inner.generated.try_fire() {
            let this = self.clone();
            tokio::spawn(async move {
                this.generate_launch_configurations().await;
                this.inner.ready_tx.send_replace(true);
            });
        }
    }

    /// Classify every current workspace folder and synthesize descriptors
    /// for managed ones
    ///
    /// Stops after the first folder that received new descriptors and offers
    /// a window reload. Returns whether any descriptors were added. Failures
    /// for one folder are logged and the pass continues.
    pub async fn generate_launch_configurations(&self) -> bool {
        for path in self.inner.workspace.folders() {
            let guard = self.folder_guard(&path);
            let held = guard.lock().await;

            let managed = self.inner.classifier.is_managed_project(&path).await;
            let folder = {
                let mut state = self.inner.state.lock().await;
                if managed {
                    let folder = state
                        .folders
                        .entry(path.clone())
                        .or_insert_with(|| ManagedFolder::new(&path, None));
                    folder.classification = Classification::Managed;
                    Some(folder.clone())
                } else {
                    if let Some(folder) = state.folders.get_mut(&path) {
                        folder.classification = Classification::NotManaged;
                    }
                    None
                }
            };

            let Some(folder) = folder else {
                continue;
            };

            match self.inner.synthesizer.synthesize(&folder).await {
                Ok(outcome) => {
                    if let Some(folder) = self.inner.state.lock().await.folders.get_mut(&path) {
                        folder.configs_synthesized = true;
                    }
                    if outcome.added_any() {
                        drop(held);
                        self.offer_reload(&path).await;
                        return true;
                    }
                }
                Err(e) => {
                    warn!("Skipping launch configuration for {:?}: {}", path, e);
                }
            }
        }

        false
    }

    async fn offer_reload(&self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let choice = self
            .inner
            .ui
            .show_message(
                MessageLevel::Info,
                &format!(
                    "Added debug configurations for {}. Reload the window to use them.",
                    name
                ),
                &[RELOAD_ACTION],
            )
            .await;

        if choice.as_deref() == Some(RELOAD_ACTION) {
            self.inner.ui.execute(HostCommand::ReloadWindow).await;
        }
    }

    /// Whether the barrier has fired
    pub fn is_ready(&self) -> bool {
        self.inner.ready.is_fired()
    }

    /// Resolve once the barrier fired and the generation pass finished
    pub async fn wait_ready(&self) {
        let mut rx = self.inner.ready_tx.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn initial_folder_paths(&self) -> &HashSet<PathBuf> {
        &self.inner.initial_folder_paths
    }

    pub async fn folder(&self, path: &Path) -> Option<ManagedFolder> {
        self.inner.state.lock().await.folders.get(path).cloned()
    }

    pub async fn folders(&self) -> Vec<ManagedFolder> {
        let state = self.inner.state.lock().await;
        let mut folders: Vec<_> = state.folders.values().cloned().collect();
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        folders
    }

    pub async fn focused_folder(&self) -> Option<PathBuf> {
        self.inner.state.lock().await.focused.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }
}
