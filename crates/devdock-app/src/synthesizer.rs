//! Launch descriptor synthesis
//!
//! Writes devdock descriptors into a folder's launch list exactly once. The
//! presence of any devdock descriptor marks the folder as configured; targets
//! are not diffed, so user edits and deletions are never undone.

use std::sync::Arc;

use devdock_core::prelude::*;
use devdock_core::TargetRuntime;

use crate::descriptor::DebugLaunchDescriptor;
use crate::folder::ManagedFolder;
use crate::host::LaunchStore;

/// Result of one synthesis attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// This many descriptors were prepended
    Added(usize),
    /// The folder already has at least one devdock descriptor
    AlreadyConfigured,
    /// The toolchain reports no runnable targets
    NoTargets,
}

impl SynthesisOutcome {
    pub fn added_any(&self) -> bool {
        matches!(self, SynthesisOutcome::Added(n) if *n > 0)
    }
}

pub struct ConfigSynthesizer<L> {
    store: Arc<L>,
}

impl<L> Clone for ConfigSynthesizer<L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<L> ConfigSynthesizer<L>
where
    L: LaunchStore + Sync,
{
    pub fn new(store: Arc<L>) -> Self {
        Self { store }
    }

    /// Descriptors the folder should contain, ignoring what is stored
    pub fn descriptors_for(folder: &ManagedFolder) -> Vec<DebugLaunchDescriptor> {
        match folder.runnable_targets() {
            Some(targets) => targets
                .iter()
                .map(|t| DebugLaunchDescriptor::for_target(folder.path(), t, TargetRuntime::Native))
                .collect(),
            None => vec![DebugLaunchDescriptor::generic_entry(folder.path())],
        }
    }

    /// Merge missing descriptors into the folder's launch list
    pub async fn synthesize(&self, folder: &ManagedFolder) -> Result<SynthesisOutcome> {
        let path = folder.path();
        let existing = self
            .store
            .get_launch_descriptors(path)
            .await
            .map_err(|e| Error::synthesis(path, e.to_string()))?;

        if existing.iter().any(DebugLaunchDescriptor::is_own) {
            debug!("{:?} already has devdock descriptors", path);
            return Ok(SynthesisOutcome::AlreadyConfigured);
        }

        let new_descriptors = Self::descriptors_for(folder);
        if new_descriptors.is_empty() {
            debug!("{:?} has no runnable targets", path);
            return Ok(SynthesisOutcome::NoTargets);
        }

        let added = new_descriptors.len();
        let mut merged = Vec::with_capacity(added + existing.len());
        for descriptor in &new_descriptors {
            merged.push(descriptor.to_value()?);
        }
        merged.extend(existing);

        self.store
            .set_launch_descriptors(path, merged)
            .await
            .map_err(|e| Error::synthesis(path, e.to_string()))?;

        info!("Added {} launch descriptors to {:?}", added, path);
        Ok(SynthesisOutcome::Added(added))
    }
}
