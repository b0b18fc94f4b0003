//! # devdock-core - Core Domain Types
//!
//! Foundation crate for devdock. Provides domain types, error handling,
//! toolchain lifecycle events, and managed-project detection.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`Device`] - A network-attached device (discovered or manually added)
//! - [`InterfaceKind`] - How a device is reachable (Ethernet, USB, LAN, manual)
//! - [`RunnableTarget`] - An executable target exposed by a toolchain context
//! - [`TargetRuntime`] - Native-compiled vs script-interpreted target runtime
//! - [`Classification`] - Per-folder classification state
//!
//! ### Events (`events`)
//! - [`ToolchainEvent`] - Closed union of folder lifecycle operations
//! - [`ToolchainContext`] - Opaque per-folder handle exposing runnable targets
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum grouped by layer
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Project Detection (`discovery`)
//! - [`detect_marker()`] - Layered filesystem heuristics for managed projects
//! - [`discover_workspace_folders()`] - Find candidate folders below a root
//! - [`manifest_targets()`] - Executable targets declared in a native manifest
//!
//! ## Prelude
//!
//! ```rust
//! use devdock_core::prelude::*;
//! ```

pub mod discovery;
pub mod error;
pub mod events;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all devdock crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use discovery::{
    detect_marker, discover_workspace_folders, manifest_targets, target_runtime, ProjectMarker,
    DEFAULT_MAX_DEPTH,
};
pub use error::{Error, Result, ResultExt};
pub use events::{FolderContext, RunnableTargets, StaticTargets, ToolchainContext, ToolchainEvent};
pub use types::{
    split_host_port, Classification, Device, InterfaceKind, RunnableTarget, TargetRuntime,
};
