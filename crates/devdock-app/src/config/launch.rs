//! `.vscode/launch.json` store
//!
//! Reads JSONC (comments allowed) and writes plain JSON atomically (temp
//! file + rename) under an exclusive lock. Entries are handled as raw JSON
//! values so foreign descriptors round-trip unchanged.

use std::io::Write;
use std::path::{Path, PathBuf};

use devdock_core::prelude::*;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::LaunchStore;

const VSCODE_DIR: &str = ".vscode";
const LAUNCH_FILENAME: &str = "launch.json";
const LAUNCH_VERSION: &str = "0.2.0";
const LOCK_FILENAME: &str = ".launch.json.lock";
const TEMP_FILENAME: &str = ".launch.json.tmp";

#[derive(Debug, Default, Deserialize, Serialize)]
struct LaunchFile {
    #[serde(default = "default_version")]
    version: String,

    #[serde(default)]
    configurations: Vec<Value>,

    /// Any other top-level keys (compounds, inputs, ...)
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

fn default_version() -> String {
    LAUNCH_VERSION.to_string()
}

/// Launch descriptors stored in each folder's `.vscode/launch.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLaunchStore;

impl FileLaunchStore {
    pub fn new() -> Self {
        Self
    }

    pub fn launch_path(folder: &Path) -> PathBuf {
        folder.join(VSCODE_DIR).join(LAUNCH_FILENAME)
    }
}

/// Read `launch.json`; a missing file reads as empty
pub fn load_launch_descriptors(folder: &Path) -> Result<Vec<Value>> {
    Ok(read_launch_file(folder)?.configurations)
}

/// Replace the `configurations` array, keeping other top-level keys
pub fn save_launch_descriptors(folder: &Path, descriptors: Vec<Value>) -> Result<()> {
    let launch_path = FileLaunchStore::launch_path(folder);
    let vscode_dir = folder.join(VSCODE_DIR);
    std::fs::create_dir_all(&vscode_dir)
        .map_err(|e| Error::config(format!("Failed to create .vscode directory: {}", e)))?;

    // Writers serialize on a sidecar lock; launch.json itself is replaced
    // by rename so a failed write leaves the previous file intact
    let lock = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(vscode_dir.join(LOCK_FILENAME))
        .map_err(|e| Error::config(format!("Failed to open launch.json lock: {}", e)))?;
    lock.lock_exclusive()
        .map_err(|e| Error::config(format!("Failed to lock launch.json: {}", e)))?;

    let mut file = read_launch_file(folder)?;
    file.configurations = descriptors;
    file.version = LAUNCH_VERSION.to_string();
    let content = serde_json::to_string_pretty(&file)?;

    let temp_path = vscode_dir.join(TEMP_FILENAME);
    let mut temp = std::fs::File::create(&temp_path)
        .map_err(|e| Error::config(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(content.as_bytes())
        .and_then(|_| temp.write_all(b"\n"))
        .and_then(|_| temp.sync_all())
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    drop(temp);

    std::fs::rename(&temp_path, &launch_path)
        .map_err(|e| Error::config(format!("Failed to replace launch.json: {}", e)))?;

    info!("Saved launch configurations to {:?}", launch_path);
    Ok(())
}

fn read_launch_file(folder: &Path) -> Result<LaunchFile> {
    let launch_path = FileLaunchStore::launch_path(folder);

    if !launch_path.exists() {
        debug!("No launch.json at {:?}", launch_path);
        return Ok(LaunchFile {
            version: default_version(),
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(&launch_path)?;
    if content.trim().is_empty() {
        return Ok(LaunchFile {
            version: default_version(),
            ..Default::default()
        });
    }

    let cleaned = strip_json_comments(&content);
    serde_json::from_str(&cleaned).map_err(|e| {
        Error::config_invalid(format!("{} is not valid JSON: {}", launch_path.display(), e))
    })
}

impl LaunchStore for FileLaunchStore {
    async fn get_launch_descriptors(&self, folder: &Path) -> Result<Vec<Value>> {
        let folder = folder.to_path_buf();
        tokio::task::spawn_blocking(move || load_launch_descriptors(&folder))
            .await
            .map_err(|e| Error::config(format!("launch.json reader panicked: {}", e)))?
    }

    async fn set_launch_descriptors(&self, folder: &Path, descriptors: Vec<Value>) -> Result<()> {
        let folder = folder.to_path_buf();
        tokio::task::spawn_blocking(move || save_launch_descriptors(&folder, descriptors))
            .await
            .map_err(|e| Error::config(format!("launch.json writer panicked: {}", e)))?
    }
}

/// Strip `//` and `/* */` comments outside of string literals
fn strip_json_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string {
            result.push(c);
            escape_next = true;
            continue;
        }

        if c == '"' {
            in_string = !in_string;
            result.push(c);
            continue;
        }

        if !in_string && c == '/' {
            match chars.peek() {
                Some('/') => {
                    while let Some(&nc) = chars.peek() {
                        if nc == '\n' {
                            break;
                        }
                        chars.next();
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for nc in chars.by_ref() {
                        if prev == '*' && nc == '/' {
                            break;
                        }
                        prev = nc;
                    }
                    continue;
                }
                _ => {}
            }
        }

        result.push(c);
    }

    result
}
