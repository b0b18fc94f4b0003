//! Device CLI process invocation

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use devdock_core::prelude::*;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Default device CLI executable name
pub const DEFAULT_PROBE_COMMAND: &str = "devdockctl";

/// Default timeout for a single probe invocation
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured output of one CLI invocation
#[derive(Debug, Clone)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Handle for invoking the device CLI
#[derive(Debug, Clone)]
pub struct DeviceCli {
    command: String,
    timeout: Duration,
}

impl Default for DeviceCli {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_COMMAND)
    }
}

impl DeviceCli {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the CLI with `args`, failing on spawn error, timeout, or non-zero exit
    pub async fn run(&self, operation: &str, args: &[&str]) -> Result<ProbeOutput> {
        self.run_with_input(operation, args, None).await
    }

    /// Like [`run`](Self::run), writing `input` as one line to the child's stdin
    pub async fn run_with_input(
        &self,
        operation: &str,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<ProbeOutput> {
        debug!("Running {} {}", self.command, args.join(" "));

        let stdin = if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ProbeNotFound {
                        command: self.command.clone(),
                    }
                } else {
                    Error::probe(format!("Failed to run {}: {}", operation, e))
                }
            })?;

        let exchange = async move {
            if let (Some(input), Some(mut pipe)) = (input, child.stdin.take()) {
                pipe.write_all(input.as_bytes()).await?;
                pipe.write_all(b"\n").await?;
                // Dropping the pipe closes the child's stdin
            }
            child.wait_with_output().await
        };

        let output = timeout(self.timeout, exchange)
            .await
            .map_err(|_| Error::probe_timeout(operation))?
            .map_err(|e| Error::probe(format!("Failed to run {}: {}", operation, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        trace!("{} stdout: {}", operation, stdout);
        if !stderr.is_empty() {
            debug!("{} stderr: {}", operation, stderr);
        }

        if !output.status.success() {
            return Err(Error::probe(format!(
                "{} failed with exit code {:?}: {}",
                operation,
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(ProbeOutput { stdout, stderr })
    }

    /// Ask the CLI whether `path` is a managed project
    ///
    /// Any failure (missing CLI, non-zero exit, timeout) counts as "no".
    pub async fn detect_project(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        match self
            .run("project detect", &["project", "detect", "--path", &path])
            .await
        {
            Ok(_) => true,
            Err(e) => {
                trace!("project detect for {} returned: {}", path, e);
                false
            }
        }
    }
}

/// Slice the outermost JSON object out of CLI output
///
/// The CLI may print progress lines before or after the JSON payload.
pub(crate) fn extract_json_object(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}
