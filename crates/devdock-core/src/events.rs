//! Toolchain lifecycle events
//!
//! The external build toolchain reports folder lifecycle changes as a closed
//! set of operations. Dispatch sites match exhaustively so a new upstream
//! operation is a compile error rather than a silent fall-through.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::types::RunnableTarget;

/// Source of runnable targets for a folder, owned by the toolchain
pub trait RunnableTargets: Send + Sync {
    /// Executable targets the folder can build and run
    fn executables(&self) -> Vec<RunnableTarget>;
}

/// Fixed target list, used when targets are known up front
#[derive(Debug, Clone, Default)]
pub struct StaticTargets(pub Vec<RunnableTarget>);

impl StaticTargets {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(RunnableTarget::new).collect())
    }
}

impl RunnableTargets for StaticTargets {
    fn executables(&self) -> Vec<RunnableTarget> {
        self.0.clone()
    }
}

/// Opaque per-folder toolchain handle
#[derive(Clone)]
pub struct ToolchainContext(Arc<dyn RunnableTargets>);

impl ToolchainContext {
    pub fn new(targets: impl RunnableTargets + 'static) -> Self {
        Self(Arc::new(targets))
    }

    pub fn executables(&self) -> Vec<RunnableTarget> {
        self.0.executables()
    }
}

impl fmt::Debug for ToolchainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolchainContext").finish_non_exhaustive()
    }
}

/// A folder as reported by the toolchain
#[derive(Debug, Clone)]
pub struct FolderContext {
    pub path: PathBuf,
    pub toolchain: ToolchainContext,
}

impl FolderContext {
    pub fn new(path: impl Into<PathBuf>, toolchain: ToolchainContext) -> Self {
        Self {
            path: path.into(),
            toolchain,
        }
    }
}

/// Folder lifecycle operation reported by the toolchain
#[derive(Debug, Clone)]
pub enum ToolchainEvent {
    /// A folder was added to the toolchain's workspace
    Add(FolderContext),
    /// A folder was removed
    Remove(PathBuf),
    /// The folder's package manifest changed
    PackageUpdated(FolderContext),
    /// Dependency resolution finished
    ResolvedUpdated(FolderContext),
    /// The toolchain's workspace state file changed
    WorkspaceStateUpdated(FolderContext),
    /// Build plugins were (re)loaded
    PluginsUpdated(FolderContext),
    /// The editor focused a folder
    Focus(PathBuf),
    /// The editor left a folder
    Unfocus(PathBuf),
}

impl ToolchainEvent {
    /// Returns a short label for this operation (for logging/debugging).
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::PackageUpdated(_) => "packageUpdated",
            Self::ResolvedUpdated(_) => "resolvedUpdated",
            Self::WorkspaceStateUpdated(_) => "workspaceStateUpdated",
            Self::PluginsUpdated(_) => "pluginsUpdated",
            Self::Focus(_) => "focus",
            Self::Unfocus(_) => "unfocus",
        }
    }

    /// Path of the folder the event concerns
    pub fn path(&self) -> &Path {
        match self {
            Self::Add(folder)
            | Self::PackageUpdated(folder)
            | Self::ResolvedUpdated(folder)
            | Self::WorkspaceStateUpdated(folder)
            | Self::PluginsUpdated(folder) => &folder.path,
            Self::Remove(path) | Self::Focus(path) | Self::Unfocus(path) => path,
        }
    }
}
