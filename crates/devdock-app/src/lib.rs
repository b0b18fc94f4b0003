//! # devdock-app - Orchestration Layer
//!
//! Decides when a multi-folder workspace is ready, writes launch
//! configurations for managed folders, keeps the device registry and turns
//! launch requests into debug adapter sessions.
//!
//! Everything outside the process (workspace view, prompts, launch and device
//! persistence, the device CLI) is reached through the traits in [`host`], so
//! the orchestrators can be driven by a terminal front-end or by the fakes in
//! `testing`.
//!
//! ## Public API
//!
//! ### Orchestrators
//! - [`ReadinessCoordinator`] - Initial-set barrier with a fallback timer
//! - [`ConfigSynthesizer`] - Idempotent launch configuration generation
//! - [`DeviceRegistry`] - Manual + discovered devices and the current device
//! - [`SessionResolver`] - Launch request to debug session descriptor
//! - [`configure_wifi()`] - Interactive wifi provisioning
//!
//! ### Collaborators (`host`)
//! - [`Workspace`], [`ProjectClassifier`], [`UserInterface`],
//!   [`DeviceProbe`], [`LaunchStore`], [`DeviceStore`]
//!
//! ### Persistence (`config`)
//! - [`Settings`] - `.devdock/config.toml`
//! - [`FileLaunchStore`] - per-folder `.vscode/launch.json`
//! - [`FileDeviceStore`] - user-level `devices.toml`

pub mod classifier;
pub mod config;
pub mod descriptor;
pub mod events;
pub mod folder;
pub mod host;
pub mod probe;
pub mod readiness;
pub mod registry;
pub mod resolver;
pub mod synthesizer;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod wifi;

pub use classifier::FsProjectClassifier;
pub use config::{
    load_settings, DebuggerBackend, DevicesFile, FileDeviceStore, FileLaunchStore, ManualDevice,
    Settings,
};
pub use descriptor::{DebugLaunchDescriptor, RequestMode};
pub use events::{EventBus, FolderEvent};
pub use folder::ManagedFolder;
pub use host::{
    DeviceProbe, DeviceStore, HostCommand, LaunchStore, MessageLevel, ProjectClassifier,
    UserInterface, Workspace,
};
pub use probe::device_cli;
pub use readiness::{OnceLatch, ReadinessCoordinator, DEFAULT_FALLBACK_TIMEOUT};
pub use registry::{DeviceRegistry, UpdateCheck};
pub use resolver::{
    ensure_debug_port, DebugSettings, SessionDescriptor, SessionResolver, NATIVE_DEBUG_PORT,
    SCRIPT_DEBUG_PORT,
};
pub use synthesizer::{ConfigSynthesizer, SynthesisOutcome};
pub use wifi::configure_wifi;
