//! devdock - Workspace readiness and remote debugging for network-attached devices
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use devdock::headless::{print_devices, print_json};
use devdock::{HeadlessRunner, TerminalUi};
use devdock_core::{logging, Result};
use devdock_probe::DeviceCli;

/// devdock - Workspace readiness and remote debugging for network-attached devices
#[derive(Parser, Debug)]
#[command(name = "devdock")]
#[command(about = "Launch configurations, devices and debug sessions for devdock projects", long_about = None)]
struct Args {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,

    /// Devices file to use instead of the user-level one
    #[arg(long, global = true, value_name = "FILE")]
    devices_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage known devices
    Devices {
        #[command(subcommand)]
        action: DevicesCommand,
    },

    /// Manage launch configurations
    Configs {
        #[command(subcommand)]
        action: ConfigsCommand,
    },

    /// Resolve a debug session and print its descriptor as JSON
    Debug {
        /// Folder containing the target
        #[arg(long, value_name = "PATH")]
        folder: PathBuf,

        /// Native target to debug
        #[arg(long)]
        target: Option<String>,

        /// Attach to the folder's script runtime instead
        #[arg(long, conflicts_with = "target")]
        script: bool,
    },

    /// Connect a device to a wifi network
    Wifi {
        /// Device id, address or name
        device: String,
    },
}

#[derive(Subcommand, Debug)]
enum DevicesCommand {
    /// Discover devices and list them with the manual ones
    List,
    /// Add a device by address
    Add { address: String },
    /// Remove a manually added device
    Remove { device: String },
    /// Make a device the current one
    Select { device: String },
}

#[derive(Subcommand, Debug)]
enum ConfigsCommand {
    /// Write launch configurations for managed folders
    Generate {
        /// Only consider the workspace root, not its subfolders
        #[arg(long)]
        root: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Err(e) = logging::init() {
        eprintln!("Logging disabled: {}", e);
    }

    let root = args
        .workspace
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let runner = HeadlessRunner::from_environment(root, args.devices_file)?;

    match run(&runner, args.command).await {
        Ok(code) => Ok(code),
        // Expected failures get a one-line message; the rest a full report
        Err(e) if e.is_user_facing() => {
            eprintln!("error: {}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(runner: &HeadlessRunner<DeviceCli, TerminalUi>, command: Command) -> Result<ExitCode> {
    match command {
        Command::Devices { action } => match action {
            DevicesCommand::List => {
                let (devices, current) = runner.list_devices().await?;
                print_devices(&devices, current.as_ref());
            }
            DevicesCommand::Add { address } => {
                let device = runner.add_device(&address).await?;
                println!("Added {} ({})", device.address, device.id);
            }
            DevicesCommand::Remove { device } => {
                let device = runner.remove_device(&device).await?;
                println!("Removed {}", device.display_name());
            }
            DevicesCommand::Select { device } => {
                let device = runner.select_device(&device).await?;
                println!("Current device: {}", device.display_name());
            }
        },
        Command::Configs {
            action: ConfigsCommand::Generate { root },
        } => {
            let folders = runner.generate_configs(root).await?;
            let configured: Vec<_> = folders.iter().filter(|f| f.configs_synthesized).collect();
            if configured.is_empty() {
                println!("No managed folders with launch configurations.");
            }
            for folder in configured {
                println!("Launch configurations ready for {}", folder.path.display());
            }
        }
        Command::Debug {
            folder,
            target,
            script,
        } => match runner
            .debug_session(&folder, target.as_deref(), script)
            .await?
        {
            Some(session) => print_json(&session)?,
            None => {
                eprintln!("Debug session cancelled.");
                return Ok(ExitCode::from(2));
            }
        },
        Command::Wifi { device } => match runner.configure_wifi(&device).await? {
            Some(result) if result.connected => {
                println!(
                    "Connected to {}",
                    result.ssid.as_deref().unwrap_or("the selected network")
                );
            }
            Some(_) => return Ok(ExitCode::FAILURE),
            None => eprintln!("Wifi setup cancelled."),
        },
    }

    Ok(ExitCode::SUCCESS)
}
