//! Tool availability checking for the device CLI

use std::path::PathBuf;

/// Cached availability of the device CLI
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    /// Whether the device CLI resolves on `PATH` (or as given path)
    pub device_cli: bool,

    /// Resolved path of the device CLI if found
    pub device_cli_path: Option<PathBuf>,
}

impl ToolAvailability {
    /// Check tool availability (run once at startup)
    pub fn check(command: &str) -> Self {
        match which::which(command) {
            Ok(path) => {
                tracing::debug!("Device CLI resolved to {}", path.display());
                Self {
                    device_cli: true,
                    device_cli_path: Some(path),
                }
            }
            Err(e) => {
                tracing::debug!("Device CLI '{}' not found: {}", command, e);
                Self::default()
            }
        }
    }

    /// Get user-friendly message when the device CLI is unavailable
    pub fn device_cli_unavailable_message(&self) -> Option<&'static str> {
        if self.device_cli {
            None
        } else {
            Some("Device CLI not found. Install devdockctl or set probe.command in .devdock/config.toml.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_availability_default() {
        let availability = ToolAvailability::default();
        assert!(!availability.device_cli);
        assert!(availability.device_cli_path.is_none());
        assert!(availability.device_cli_unavailable_message().is_some());
    }

    #[test]
    fn test_missing_command() {
        let availability = ToolAvailability::check("devdockctl-definitely-not-installed");
        assert!(!availability.device_cli);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_command() {
        let availability = ToolAvailability::check("sh");
        assert!(availability.device_cli);
        assert!(availability.device_cli_unavailable_message().is_none());
    }
}
