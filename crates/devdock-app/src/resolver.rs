//! Debug session resolution
//!
//! Turns a devdock launch request into the descriptor a debug adapter
//! consumes. Unmet preconditions (no SDK path, SDK path missing on disk, no
//! current device) show a remediation prompt and resolve to `Ok(None)`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use devdock_core::prelude::*;
use devdock_core::{split_host_port, Device, TargetRuntime};
use serde::Serialize;

use crate::config::{DebuggerBackend, Settings};
use crate::descriptor::{DebugLaunchDescriptor, RequestMode};
use crate::host::{DeviceProbe, DeviceStore, HostCommand, MessageLevel, UserInterface};
use crate::registry::DeviceRegistry;

/// Remote gdb server port for native targets
pub const NATIVE_DEBUG_PORT: u16 = 4242;

/// Remote debug server port for script targets
pub const SCRIPT_DEBUG_PORT: u16 = 5678;

const CONFIGURE_ACTION: &str = "Configure";
const ADD_DEVICE_ACTION: &str = "Add Device";
const SELECT_DEVICE_ACTION: &str = "Select Device";

/// Rewrite `address` to use `port`
///
/// Any existing port is replaced, even when it already equals `port` or is
/// not numeric. Bare IPv6 literals (more than one colon) are bracketed.
pub fn ensure_debug_port(address: &str, port: u16) -> String {
    if let Some((host, _)) = split_host_port(address) {
        return format!("{}:{}", host, port);
    }
    if address.starts_with('[') {
        return match address.rsplit_once("]:") {
            Some((host, _)) => format!("{}]:{}", host, port),
            None => format!("{}:{}", address, port),
        };
    }
    if address.matches(':').count() > 1 {
        return format!("[{}]:{}", address, port);
    }
    let host = address.rsplit_once(':').map_or(address, |(host, _)| host);
    format!("{}:{}", host, port)
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Attach-mode native session (init and attach command lists)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LldbAttachSession {
    #[serde(rename = "type")]
    pub kind: String,
    pub request: RequestMode,
    pub name: String,
    pub program: String,
    pub init_commands: Vec<String>,
    pub attach_commands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_launch_task: Option<String>,
}

/// Launch-mode native session carrying the device address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LldbDapSession {
    #[serde(rename = "type")]
    pub kind: String,
    pub request: RequestMode,
    pub name: String,
    pub program: String,
    pub device_address: String,
    pub target_create_commands: Vec<String>,
    pub process_create_commands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_launch_task: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMapping {
    pub local_root: String,
    pub remote_root: String,
}

/// Attach to a remote interpreter debug server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptAttachSession {
    #[serde(rename = "type")]
    pub kind: String,
    pub request: RequestMode,
    pub name: String,
    pub connect: Endpoint,
    pub path_mappings: Vec<PathMapping>,
    pub just_my_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_launch_task: Option<String>,
}

/// Descriptor handed to the debug adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SessionDescriptor {
    LldbAttach(LldbAttachSession),
    LldbDap(LldbDapSession),
    ScriptAttach(ScriptAttachSession),
}

impl SessionDescriptor {
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Settings the resolver reads
#[derive(Debug, Clone)]
pub struct DebugSettings {
    pub sdk_path: Option<String>,
    pub backend: DebuggerBackend,
    pub build_dir: String,
    pub remote_root: String,
    pub settle_delay: Duration,
}

impl From<&Settings> for DebugSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            sdk_path: settings.native.sdk_path.clone(),
            backend: settings.native.backend,
            build_dir: settings.native.build_dir.clone(),
            remote_root: settings.script.remote_root.clone(),
            settle_delay: settings.script.settle_delay(),
        }
    }
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

pub struct SessionResolver<P, S, U> {
    registry: DeviceRegistry<P, S, U>,
    ui: Arc<U>,
    settings: DebugSettings,
}

impl<P, S, U> SessionResolver<P, S, U>
where
    P: DeviceProbe + Sync + 'static,
    S: DeviceStore + Sync + 'static,
    U: UserInterface + Sync + 'static,
{
    pub fn new(registry: DeviceRegistry<P, S, U>, ui: Arc<U>, settings: DebugSettings) -> Self {
        Self {
            registry,
            ui,
            settings,
        }
    }

    pub fn settings(&self) -> &DebugSettings {
        &self.settings
    }

    /// Resolve a launch request for a target in `folder`
    ///
    /// Returns `Ok(None)` when the session was cancelled at a precondition
    /// prompt.
    pub async fn resolve(
        &self,
        folder: &Path,
        request: &DebugLaunchDescriptor,
    ) -> Result<Option<SessionDescriptor>> {
        let mut request = request.clone();
        request.ensure_pre_launch_task();

        match request.runtime {
            TargetRuntime::Native => self.resolve_native(folder, request).await,
            TargetRuntime::Script => self.resolve_script(folder, request).await,
        }
    }

    async fn resolve_native(
        &self,
        folder: &Path,
        request: DebugLaunchDescriptor,
    ) -> Result<Option<SessionDescriptor>> {
        let Some(sdk) = self.sdk_path_or_prompt().await else {
            return Ok(None);
        };
        let Some(device) = self.current_device_or_prompt().await? else {
            return Ok(None);
        };
        let target = request.target.as_deref().ok_or_else(|| {
            Error::config_invalid(format!(
                "Launch configuration '{}' has no target",
                request.name
            ))
        })?;

        let address = ensure_debug_port(&device.address, NATIVE_DEBUG_PORT);
        let program = folder
            .join(&self.settings.build_dir)
            .join(target)
            .to_string_lossy()
            .into_owned();
        let target_create = format!("target create \"{}\"", program);
        let connect = format!("gdb-remote {}", address);

        info!(
            "Debugging {} on {} via {}",
            target, address, self.settings.backend
        );

        let session = match self.settings.backend {
            DebuggerBackend::LldbAttach => SessionDescriptor::LldbAttach(LldbAttachSession {
                kind: "lldb".to_string(),
                request: RequestMode::Attach,
                name: request.name,
                program,
                init_commands: vec![
                    format!("settings set target.sdk-path \"{}\"", sdk.display()),
                    format!(
                        "settings append target.exec-search-paths \"{}\"",
                        sdk.join("usr").join("lib").display()
                    ),
                ],
                attach_commands: vec![target_create, connect],
                pre_launch_task: request.pre_launch_task,
            }),
            DebuggerBackend::LldbDap => SessionDescriptor::LldbDap(LldbDapSession {
                kind: "lldb-dap".to_string(),
                request: RequestMode::Launch,
                name: request.name,
                program,
                device_address: address,
                target_create_commands: vec![target_create],
                process_create_commands: vec![connect],
                pre_launch_task: request.pre_launch_task,
            }),
        };

        Ok(Some(session))
    }

    async fn resolve_script(
        &self,
        folder: &Path,
        request: DebugLaunchDescriptor,
    ) -> Result<Option<SessionDescriptor>> {
        let Some(device) = self.current_device_or_prompt().await? else {
            return Ok(None);
        };

        // Give the remote debug server time to start listening
        tokio::time::sleep(self.settings.settle_delay).await;

        let host = device.hostname().to_string();
        info!("Attaching to {}:{}", host, SCRIPT_DEBUG_PORT);

        Ok(Some(SessionDescriptor::ScriptAttach(ScriptAttachSession {
            kind: "debugpy".to_string(),
            request: RequestMode::Attach,
            name: request.name,
            connect: Endpoint {
                host,
                port: SCRIPT_DEBUG_PORT,
            },
            path_mappings: vec![PathMapping {
                local_root: folder.to_string_lossy().into_owned(),
                remote_root: self.settings.remote_root.clone(),
            }],
            just_my_code: false,
            pre_launch_task: request.pre_launch_task,
        })))
    }

    async fn sdk_path_or_prompt(&self) -> Option<PathBuf> {
        let raw = self
            .settings
            .sdk_path
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let Some(raw) = raw else {
            self.prompt_configure_sdk("The device SDK path is not configured.")
                .await;
            return None;
        };

        match dunce::canonicalize(expand_tilde(raw)) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("SDK path {} does not resolve: {}", raw, e);
                self.prompt_configure_sdk(&format!("The device SDK path '{}' does not exist.", raw))
                    .await;
                None
            }
        }
    }

    async fn prompt_configure_sdk(&self, message: &str) {
        let choice = self
            .ui
            .show_message(MessageLevel::Warning, message, &[CONFIGURE_ACTION])
            .await;
        if choice.as_deref() == Some(CONFIGURE_ACTION) {
            self.ui.execute(HostCommand::ConfigureSdkPath).await;
        }
    }

    async fn current_device_or_prompt(&self) -> Result<Option<Device>> {
        if let Some(device) = self.registry.current_device().await? {
            return Ok(Some(device));
        }

        let choice = self
            .ui
            .show_message(
                MessageLevel::Warning,
                "No device selected. Add or select a device to debug on.",
                &[ADD_DEVICE_ACTION, SELECT_DEVICE_ACTION],
            )
            .await;

        match choice.as_deref() {
            Some(ADD_DEVICE_ACTION) => self.ui.execute(HostCommand::AddDevice).await,
            Some(SELECT_DEVICE_ACTION) => self.ui.execute(HostCommand::SelectDevice).await,
            _ => {}
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::testing::{FakeProbe, MemoryDeviceStore, ScriptedUi};
    use devdock_core::RunnableTarget;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::tempdir;
    use tokio::time::Instant;

    type TestResolver = SessionResolver<FakeProbe, MemoryDeviceStore, ScriptedUi>;

    fn resolver(
        store: MemoryDeviceStore,
        ui: ScriptedUi,
        settings: DebugSettings,
    ) -> (TestResolver, Arc<ScriptedUi>) {
        let ui = Arc::new(ui);
        let registry = DeviceRegistry::new(
            Arc::new(FakeProbe::new().with_version("1.0.0", None)),
            Arc::new(store),
            Arc::clone(&ui),
            Arc::new(EventBus::new()),
        );
        (SessionResolver::new(registry, Arc::clone(&ui), settings), ui)
    }

    fn with_device(address: &str) -> MemoryDeviceStore {
        MemoryDeviceStore::with_devices(&[("dev", address)]).with_current("dev")
    }

    fn settings(sdk: Option<&Path>, backend: DebuggerBackend) -> DebugSettings {
        DebugSettings {
            sdk_path: sdk.map(|p| p.to_string_lossy().into_owned()),
            backend,
            settle_delay: Duration::from_millis(1000),
            ..DebugSettings::default()
        }
    }

    fn native_request(target: &str) -> DebugLaunchDescriptor {
        DebugLaunchDescriptor::for_target(
            Path::new("/ws/app"),
            &RunnableTarget::new(target),
            TargetRuntime::Native,
        )
    }

    #[test]
    fn test_ensure_debug_port() {
        assert_eq!(ensure_debug_port("10.0.0.5", 4242), "10.0.0.5:4242");
        assert_eq!(ensure_debug_port("10.0.0.5:9999", 4242), "10.0.0.5:4242");
        assert_eq!(ensure_debug_port("10.0.0.5:4242", 4242), "10.0.0.5:4242");
        assert_eq!(ensure_debug_port("kit.local", 5678), "kit.local:5678");
        assert_eq!(ensure_debug_port("fe80::1", 4242), "[fe80::1]:4242");
        assert_eq!(ensure_debug_port("[fe80::1]:22", 4242), "[fe80::1]:4242");
    }

    #[test]
    fn test_ensure_debug_port_replaces_named_port() {
        assert_eq!(ensure_debug_port("kit.local:ssh", 4242), "kit.local:4242");
        assert_eq!(ensure_debug_port("10.0.0.5:", 5678), "10.0.0.5:5678");
        assert_eq!(ensure_debug_port("[fe80::1]", 4242), "[fe80::1]:4242");
        assert_eq!(ensure_debug_port("[fe80::1]:ssh", 4242), "[fe80::1]:4242");
    }

    #[test]
    #[serial]
    fn test_expand_tilde() {
        let home = tempdir().unwrap();
        let previous = std::env::var_os("HOME");
        std::env::set_var("HOME", home.path());

        assert_eq!(expand_tilde("~/sdk"), home.path().join("sdk"));
        assert_eq!(expand_tilde("~"), home.path());
        assert_eq!(expand_tilde("/opt/sdk"), PathBuf::from("/opt/sdk"));
        assert_eq!(expand_tilde("~other/sdk"), PathBuf::from("~other/sdk"));

        match previous {
            Some(value) => std::env::set_var("HOME", value),
            None => std::env::remove_var("HOME"),
        }
    }

    #[tokio::test]
    async fn test_no_current_device_cancels() {
        let sdk = tempdir().unwrap();
        let (resolver, ui) = resolver(
            MemoryDeviceStore::new(),
            ScriptedUi::new().answer_action(Some(ADD_DEVICE_ACTION)),
            settings(Some(sdk.path()), DebuggerBackend::LldbAttach),
        );

        let session = resolver
            .resolve(Path::new("/ws/app"), &native_request("App"))
            .await
            .unwrap();

        assert!(session.is_none());
        assert_eq!(ui.commands(), vec![HostCommand::AddDevice]);
    }

    #[tokio::test]
    async fn test_missing_sdk_path_cancels_before_device_check() {
        let (resolver, ui) = resolver(
            with_device("10.0.0.5"),
            ScriptedUi::new().answer_action(Some(CONFIGURE_ACTION)),
            settings(None, DebuggerBackend::LldbAttach),
        );

        let session = resolver
            .resolve(Path::new("/ws/app"), &native_request("App"))
            .await
            .unwrap();

        assert!(session.is_none());
        assert_eq!(ui.commands(), vec![HostCommand::ConfigureSdkPath]);
        assert!(ui.has_message_containing("not configured"));
    }

    #[tokio::test]
    async fn test_nonexistent_sdk_path_cancels() {
        let sdk = tempdir().unwrap();
        let missing = sdk.path().join("missing.sdk");
        let (resolver, ui) = resolver(
            with_device("10.0.0.5"),
            ScriptedUi::new(),
            settings(Some(&missing), DebuggerBackend::LldbAttach),
        );

        let session = resolver
            .resolve(Path::new("/ws/app"), &native_request("App"))
            .await
            .unwrap();

        assert!(session.is_none());
        assert!(ui.has_message_containing("does not exist"));
        assert!(ui.commands().is_empty());
    }

    #[tokio::test]
    async fn test_lldb_attach_descriptor() {
        let sdk = tempdir().unwrap();
        let sdk_path = dunce::canonicalize(sdk.path()).unwrap();
        let (resolver, _) = resolver(
            with_device("10.0.0.5:9999"),
            ScriptedUi::new(),
            settings(Some(sdk.path()), DebuggerBackend::LldbAttach),
        );

        let session = resolver
            .resolve(Path::new("/ws/app"), &native_request("App"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            session.to_value().unwrap(),
            json!({
                "type": "lldb",
                "request": "attach",
                "name": "Debug App",
                "program": "/ws/app/.build/debug/App",
                "initCommands": [
                    format!("settings set target.sdk-path \"{}\"", sdk_path.display()),
                    format!(
                        "settings append target.exec-search-paths \"{}\"",
                        sdk_path.join("usr").join("lib").display()
                    ),
                ],
                "attachCommands": [
                    "target create \"/ws/app/.build/debug/App\"",
                    "gdb-remote 10.0.0.5:4242"
                ],
                "preLaunchTask": "devdock: build App"
            })
        );
    }

    #[tokio::test]
    async fn test_lldb_dap_descriptor() {
        let sdk = tempdir().unwrap();
        let (resolver, _) = resolver(
            with_device("kit.local"),
            ScriptedUi::new(),
            settings(Some(sdk.path()), DebuggerBackend::LldbDap),
        );

        let session = resolver
            .resolve(Path::new("/ws/app"), &native_request("App"))
            .await
            .unwrap()
            .unwrap();

        let SessionDescriptor::LldbDap(dap) = session else {
            panic!("expected lldb-dap session, got {:?}", session);
        };
        assert_eq!(dap.request, RequestMode::Launch);
        assert_eq!(dap.device_address, "kit.local:4242");
        assert_eq!(dap.process_create_commands, vec!["gdb-remote kit.local:4242"]);
        assert_eq!(
            dap.target_create_commands,
            vec!["target create \"/ws/app/.build/debug/App\""]
        );
    }

    #[tokio::test]
    async fn test_missing_pre_launch_task_is_synthesized() {
        let sdk = tempdir().unwrap();
        let (resolver, _) = resolver(
            with_device("10.0.0.5"),
            ScriptedUi::new(),
            settings(Some(sdk.path()), DebuggerBackend::LldbDap),
        );
        let mut request = native_request("Tool");
        request.pre_launch_task = None;

        let session = resolver
            .resolve(Path::new("/ws/app"), &request)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            session.to_value().unwrap()["preLaunchTask"],
            "devdock: build Tool"
        );
    }

    #[tokio::test]
    async fn test_native_request_without_target_is_invalid() {
        let sdk = tempdir().unwrap();
        let (resolver, _) = resolver(
            with_device("10.0.0.5"),
            ScriptedUi::new(),
            settings(Some(sdk.path()), DebuggerBackend::LldbAttach),
        );
        let mut request = native_request("App");
        request.target = None;

        let err = resolver
            .resolve(Path::new("/ws/app"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_attach_waits_and_skips_sdk() {
        let (resolver, _) = resolver(
            with_device("kit.local:2222"),
            ScriptedUi::new(),
            settings(None, DebuggerBackend::LldbAttach),
        );
        let request = DebugLaunchDescriptor::generic_entry(Path::new("/ws/sensor"));
        let start = Instant::now();

        let session = resolver
            .resolve(Path::new("/ws/sensor"), &request)
            .await
            .unwrap()
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(
            session.to_value().unwrap(),
            json!({
                "type": "debugpy",
                "request": "attach",
                "name": "Debug sensor",
                "connect": {"host": "kit.local", "port": 5678},
                "pathMappings": [{"localRoot": "/ws/sensor", "remoteRoot": "/app"}],
                "justMyCode": false,
                "preLaunchTask": "devdock: deploy"
            })
        );
    }

    #[tokio::test]
    async fn test_script_without_device_cancels() {
        let (resolver, ui) = resolver(
            MemoryDeviceStore::new(),
            ScriptedUi::new(),
            settings(None, DebuggerBackend::LldbAttach),
        );
        let request = DebugLaunchDescriptor::generic_entry(Path::new("/ws/sensor"));

        assert!(resolver
            .resolve(Path::new("/ws/sensor"), &request)
            .await
            .unwrap()
            .is_none());
        assert!(ui.has_message_containing("No device selected"));
        assert!(!ui.has_message_containing("SDK"));
    }
}
