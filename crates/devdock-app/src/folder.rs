//! Per-folder orchestration state

use std::path::{Path, PathBuf};

use devdock_core::{Classification, RunnableTarget, ToolchainContext};

/// A workspace folder tracked by the readiness coordinator
///
/// At most one instance exists per folder path.
#[derive(Debug, Clone)]
pub struct ManagedFolder {
    pub path: PathBuf,
    pub classification: Classification,
    /// Absent for folders whose runtime has no toolchain integration
    pub toolchain: Option<ToolchainContext>,
    pub configs_synthesized: bool,
}

impl ManagedFolder {
    pub fn new(path: impl Into<PathBuf>, toolchain: Option<ToolchainContext>) -> Self {
        Self {
            path: path.into(),
            classification: Classification::Unclassified,
            toolchain,
            configs_synthesized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_managed(&self) -> bool {
        self.classification == Classification::Managed
    }

    pub fn needs_classification(&self) -> bool {
        self.classification == Classification::Unclassified
    }

    /// Runnable targets, or `None` when there is no toolchain context
    pub fn runnable_targets(&self) -> Option<Vec<RunnableTarget>> {
        self.toolchain.as_ref().map(ToolchainContext::executables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devdock_core::StaticTargets;

    #[test]
    fn test_new_folder_is_unclassified() {
        let folder = ManagedFolder::new("/ws/a", None);
        assert!(folder.needs_classification());
        assert!(!folder.is_managed());
        assert!(!folder.configs_synthesized);
        assert!(folder.runnable_targets().is_none());
    }

    #[test]
    fn test_runnable_targets_from_toolchain() {
        let toolchain = ToolchainContext::new(StaticTargets::from_names(["App", "Tool"]));
        let mut folder = ManagedFolder::new("/ws/a", Some(toolchain));
        folder.classification = Classification::Managed;

        assert!(folder.is_managed());
        let names: Vec<_> = folder
            .runnable_targets()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["App", "Tool"]);
    }
}
