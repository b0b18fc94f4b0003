//! Filesystem-backed project classifier

use std::path::Path;

use devdock_core::prelude::*;
use devdock_core::{detect_marker, target_runtime, TargetRuntime};
use devdock_probe::DeviceCli;

use crate::host::ProjectClassifier;

/// Classifies folders by marker files and manifests, then optionally asks
/// the device CLI
#[derive(Debug, Clone, Default)]
pub struct FsProjectClassifier {
    cli: Option<DeviceCli>,
}

impl FsProjectClassifier {
    /// Filesystem heuristics only
    pub fn new() -> Self {
        Self { cli: None }
    }

    /// Fall back to `project detect` when the heuristics find nothing
    pub fn with_cli(cli: DeviceCli) -> Self {
        Self { cli: Some(cli) }
    }

    pub fn runtime(&self, path: &Path) -> TargetRuntime {
        target_runtime(path)
    }
}

impl ProjectClassifier for FsProjectClassifier {
    async fn is_managed_project(&self, path: &Path) -> bool {
        if let Some(marker) = detect_marker(path) {
            debug!("{:?} is managed ({:?})", path, marker);
            return true;
        }

        match &self.cli {
            Some(cli) => cli.detect_project(path).await,
            None => false,
        }
    }
}
