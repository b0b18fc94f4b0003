//! Headless mode - terminal prompts and plain-text output
//!
//! Host collaborators for running devdock outside an editor. Prompts are
//! `dialoguer` widgets on stderr; Esc, an empty answer or a terminal that
//! cannot prompt dismisses them. Command results go to stdout so they can
//! be piped.

pub mod runner;

use std::io::{self, Write};
use std::path::PathBuf;

use devdock_app::{HostCommand, MessageLevel, UserInterface, Workspace};
use devdock_core::Device;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};
use serde::Serialize;
use tracing::error;

pub use runner::HeadlessRunner;

/// Fixed folder list standing in for an editor workspace
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspace {
    folders: Vec<PathBuf>,
}

impl StaticWorkspace {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self { folders }
    }
}

impl Workspace for StaticWorkspace {
    fn folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }
}

/// Treat blank text answers as dismissed
fn answered(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Run a blocking `dialoguer` prompt off the async runtime
///
/// Prompt errors (no terminal, closed input) are logged and read as a
/// dismissal.
async fn prompt<T, F>(widget: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<Option<T>> + Send + 'static,
{
    match tokio::task::spawn_blocking(widget).await {
        Ok(Ok(answer)) => answer,
        Ok(Err(e)) => {
            error!("Prompt failed: {}", e);
            None
        }
        Err(e) => {
            error!("Prompt task failed: {}", e);
            None
        }
    }
}

/// Interactive prompts on the terminal
#[derive(Debug, Default)]
pub struct TerminalUi;

impl TerminalUi {
    pub fn new() -> Self {
        Self
    }
}

impl UserInterface for TerminalUi {
    async fn show_message(
        &self,
        level: MessageLevel,
        message: &str,
        actions: &[&str],
    ) -> Option<String> {
        let prefix = match level {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        };
        eprintln!("{}: {}", prefix, message);

        if actions.is_empty() {
            return None;
        }

        let items: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        let choices = items.clone();
        let index = prompt(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Choose an action (Esc to dismiss)")
                .items(&choices)
                .default(0)
                .interact_opt()
        })
        .await?;
        items.get(index).cloned()
    }

    async fn input(&self, prompt_text: &str, secret: bool) -> Option<String> {
        let label = prompt_text.to_string();
        let text = if secret {
            prompt(move || {
                Password::with_theme(&ColorfulTheme::default())
                    .with_prompt(label)
                    .allow_empty_password(true)
                    .interact()
                    .map(Some)
            })
            .await?
        } else {
            prompt(move || {
                Input::<String>::with_theme(&ColorfulTheme::default())
                    .with_prompt(label)
                    .allow_empty(true)
                    .interact_text()
                    .map(Some)
            })
            .await?
        };
        answered(text)
    }

    async fn pick(&self, title: &str, items: &[String]) -> Option<usize> {
        if items.is_empty() {
            return None;
        }
        let title = title.to_string();
        let choices = items.to_vec();
        prompt(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(title)
                .items(&choices)
                .default(0)
                .interact_opt()
        })
        .await
    }

    async fn execute(&self, command: HostCommand) {
        let hint = match command {
            HostCommand::ConfigureSdkPath => {
                "Set `sdk_path` under [native] in .devdock/config.toml"
            }
            HostCommand::AddDevice => "Run `devdock devices add <address>`",
            HostCommand::SelectDevice => "Run `devdock devices select <device>`",
            HostCommand::ReloadWindow => {
                "Reload your editor window to pick up the new launch configurations"
            }
            HostCommand::RefreshViews => "Run `devdock devices list` to refresh",
        };
        eprintln!("-> {}", hint);
    }
}

/// Print a device table, marking the current device
pub fn print_devices(devices: &[Device], current: Option<&Device>) {
    if devices.is_empty() {
        println!("No devices found.");
        return;
    }

    for device in devices {
        let marker = if current.is_some_and(|c| c.id == device.id) {
            "*"
        } else {
            " "
        };
        println!("{} {:<40} {}", marker, device.id, device.display_name());
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> devdock_core::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_answer_dismisses() {
        assert_eq!(answered(String::new()), None);
        assert_eq!(answered("   ".to_string()), None);
        assert_eq!(answered(" hunter2 ".to_string()), Some("hunter2".to_string()));
    }

    #[tokio::test]
    async fn test_prompt_error_reads_as_dismissal() {
        let answer: Option<usize> = prompt(|| {
            Err(dialoguer::Error::IO(io::Error::new(
                io::ErrorKind::NotConnected,
                "not a terminal",
            )))
        })
        .await;
        assert_eq!(answer, None);
    }

    #[tokio::test]
    async fn test_prompt_passes_answer_through() {
        assert_eq!(prompt(|| Ok(Some(2usize))).await, Some(2));
        assert_eq!(prompt(|| Ok(None::<usize>)).await, None);
    }

    #[tokio::test]
    async fn test_pick_without_items_skips_prompt() {
        assert_eq!(TerminalUi::new().pick("Networks", &[]).await, None);
    }

    #[test]
    fn test_static_workspace() {
        let workspace = StaticWorkspace::new(vec![PathBuf::from("/ws/a")]);
        assert_eq!(workspace.folders(), vec![PathBuf::from("/ws/a")]);
    }
}
