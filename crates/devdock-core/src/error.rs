//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
///
/// Unmet session preconditions (no SDK path, no current device) are not
/// errors: they resolve to a cancelled session instead.
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    // ─────────────────────────────────────────────────────────────
    // Device Probe Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Device CLI '{command}' not found. Install it or set probe.command in .devdock/config.toml")]
    ProbeNotFound { command: String },

    #[error("Device probe error: {message}")]
    Probe { message: String },

    #[error("Device probe timed out: {operation}")]
    ProbeTimeout { operation: String },

    #[error("Malformed probe output: {message}")]
    ProbeOutput { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Device Registry Errors
    // ─────────────────────────────────────────────────────────────
    #[error("A device with address '{address}' already exists")]
    DuplicateDevice { address: String },

    #[error("Device not found: {id}")]
    DeviceNotFound { id: String },

    // ─────────────────────────────────────────────────────────────
    // Workspace Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to synthesize launch configurations for {path}: {message}")]
    Synthesis { path: PathBuf, message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    pub fn probe_timeout(operation: impl Into<String>) -> Self {
        Self::ProbeTimeout {
            operation: operation.into(),
        }
    }

    pub fn probe_output(message: impl Into<String>) -> Self {
        Self::ProbeOutput {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn duplicate_device(address: impl Into<String>) -> Self {
        Self::DuplicateDevice {
            address: address.into(),
        }
    }

    pub fn device_not_found(id: impl Into<String>) -> Self {
        Self::DeviceNotFound { id: id.into() }
    }

    pub fn synthesis(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Synthesis {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if the error should be shown to the user as a message
    /// (as opposed to only being logged)
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::ProbeNotFound { .. }
                | Error::Probe { .. }
                | Error::ProbeTimeout { .. }
                | Error::DuplicateDevice { .. }
                | Error::DeviceNotFound { .. }
                | Error::ConfigInvalid { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
