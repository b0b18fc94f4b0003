//! Debug launch descriptors owned by devdock
//!
//! Descriptors live in a shared list alongside entries written by other tools.
//! Ours are recognized by the `"type": "devdock"` tag; everything else is left
//! untouched as raw JSON.

use std::path::Path;

use devdock_core::prelude::*;
use devdock_core::{RunnableTarget, TargetRuntime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag identifying devdock descriptors
pub const DESCRIPTOR_KIND: &str = "devdock";

/// Pre-launch step for entries without a build target
pub const DEPLOY_TASK: &str = "devdock: deploy";

/// Pre-launch build step for a target
pub fn build_task_for(target: &str) -> String {
    format!("devdock: build {}", target)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    Launch,
    Attach,
}

/// A devdock launch/attach request as persisted in the launch store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugLaunchDescriptor {
    #[serde(rename = "type")]
    pub kind: String,

    pub request: RequestMode,

    pub name: String,

    #[serde(default)]
    pub runtime: TargetRuntime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    pub cwd: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_launch_task: Option<String>,
}

impl DebugLaunchDescriptor {
    /// Descriptor launching one runnable target of a folder
    pub fn for_target(folder: &Path, target: &RunnableTarget, runtime: TargetRuntime) -> Self {
        Self {
            kind: DESCRIPTOR_KIND.to_string(),
            request: RequestMode::Launch,
            name: format!("Debug {}", target.name),
            runtime,
            target: Some(target.name.clone()),
            cwd: folder.to_string_lossy().into_owned(),
            pre_launch_task: Some(build_task_for(&target.name)),
        }
    }

    /// Generic entry point for a folder without a toolchain context
    pub fn generic_entry(folder: &Path) -> Self {
        let folder_name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| folder.to_string_lossy().into_owned());

        Self {
            kind: DESCRIPTOR_KIND.to_string(),
            request: RequestMode::Attach,
            name: format!("Debug {}", folder_name),
            runtime: TargetRuntime::Script,
            target: None,
            cwd: folder.to_string_lossy().into_owned(),
            pre_launch_task: Some(DEPLOY_TASK.to_string()),
        }
    }

    /// Whether a raw launch entry carries the devdock kind tag
    pub fn is_own(value: &Value) -> bool {
        value.get("type").and_then(Value::as_str) == Some(DESCRIPTOR_KIND)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        if !Self::is_own(value) {
            return Err(Error::config_invalid(format!(
                "launch entry is not a {} descriptor",
                DESCRIPTOR_KIND
            )));
        }
        Ok(Self::deserialize(value)?)
    }

    /// Fill in the pre-launch build step from the target when missing
    pub fn ensure_pre_launch_task(&mut self) {
        if self.pre_launch_task.is_none() {
            if let Some(target) = &self.target {
                self.pre_launch_task = Some(build_task_for(target));
            }
        }
    }
}
