//! Managed project detection
//!
//! Recognizes folders that belong to the devdock build/debug workflow using
//! layered filesystem heuristics: a `devdock.json` marker file, then a
//! dependency on the device SDK in a native or script manifest. The optional
//! CLI probe layer lives with the process collaborators in `devdock-probe`.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::types::{RunnableTarget, TargetRuntime};

/// Default maximum search depth
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Marker file that opts a folder into the workflow
pub const CONFIG_FILENAME: &str = "devdock.json";

/// Manifest for native-compiled projects
pub const NATIVE_MANIFEST: &str = "Package.swift";

/// Manifests for script-interpreted projects
pub const SCRIPT_MANIFESTS: &[&str] = &["requirements.txt", "pyproject.toml"];

/// Directories to skip during search
const SKIP_DIRECTORIES: &[&str] = &[
    "node_modules",
    "build",
    ".build",
    ".git",
    ".idea",
    ".vscode",
    ".swiftpm",
    "__pycache__",
    ".venv",
    "venv",
    "target",
];

static NATIVE_SDK_DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.package\s*\([^)]*devdock-sdk"#).expect("valid native dependency regex")
});

static SCRIPT_SDK_DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*["']?devdock(\[[^\]]*\])?\s*(["',]|[=<>~!]|$)"#)
        .expect("valid script dependency regex")
});

static EXECUTABLE_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.executableTarget\s*\(\s*name\s*:\s*"([^"]+)""#)
        .expect("valid executable target regex")
});

/// Which heuristic recognized a folder as managed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectMarker {
    /// `devdock.json` is present
    ConfigFile,
    /// `Package.swift` depends on the device SDK
    NativeManifest,
    /// A script manifest depends on the device SDK
    ScriptManifest,
}

/// Run the filesystem heuristics in order, returning the first that matches
pub fn detect_marker(path: &Path) -> Option<ProjectMarker> {
    if path.join(CONFIG_FILENAME).is_file() {
        trace!("{:?} has {}", path, CONFIG_FILENAME);
        return Some(ProjectMarker::ConfigFile);
    }

    if let Ok(content) = fs::read_to_string(path.join(NATIVE_MANIFEST)) {
        if check_native_dependency(&content) {
            return Some(ProjectMarker::NativeManifest);
        }
    }

    for manifest in SCRIPT_MANIFESTS {
        if let Ok(content) = fs::read_to_string(path.join(manifest)) {
            if check_script_dependency(&content) {
                return Some(ProjectMarker::ScriptManifest);
            }
        }
    }

    None
}

pub(crate) fn check_native_dependency(content: &str) -> bool {
    NATIVE_SDK_DEPENDENCY.is_match(content)
}

pub(crate) fn check_script_dependency(content: &str) -> bool {
    SCRIPT_SDK_DEPENDENCY.is_match(content)
}

/// Runtime of the folder's targets: native when a native manifest exists
pub fn target_runtime(path: &Path) -> TargetRuntime {
    if path.join(NATIVE_MANIFEST).is_file() {
        TargetRuntime::Native
    } else {
        TargetRuntime::Script
    }
}

/// Executable targets declared in the folder's native manifest
///
/// Returns an empty list when there is no manifest.
pub fn manifest_targets(path: &Path) -> Vec<RunnableTarget> {
    match fs::read_to_string(path.join(NATIVE_MANIFEST)) {
        Ok(content) => parse_executable_targets(&content),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn parse_executable_targets(content: &str) -> Vec<RunnableTarget> {
    EXECUTABLE_TARGET
        .captures_iter(content)
        .map(|caps| RunnableTarget::new(&caps[1]))
        .collect()
}

fn is_project_folder(path: &Path) -> bool {
    path.join(CONFIG_FILENAME).is_file()
        || path.join(NATIVE_MANIFEST).is_file()
        || SCRIPT_MANIFESTS.iter().any(|m| path.join(m).is_file())
}

/// Find candidate workspace folders at or below `base_path`
///
/// A candidate is any folder carrying a project file. The search does not
/// descend into candidates. Results are sorted by path.
pub fn discover_workspace_folders(base_path: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();

    if is_project_folder(base_path) {
        debug!("Base path is a project folder: {:?}", base_path);
        found.push(base_path.to_path_buf());
        return found;
    }

    discover_recursive(base_path, 0, max_depth, &mut found);
    found.sort();
    found
}

fn discover_recursive(dir: &Path, current_depth: usize, max_depth: usize, found: &mut Vec<PathBuf>) {
    if current_depth > max_depth {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(err) => {
            trace!("Cannot read directory {:?}: {}", dir, err);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let dir_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };

        if dir_name.starts_with('.') || SKIP_DIRECTORIES.contains(&dir_name) {
            trace!("Skipping directory: {:?}", path);
            continue;
        }

        if is_project_folder(&path) {
            debug!("Found project folder: {:?}", path);
            found.push(path);
            continue;
        }

        discover_recursive(&path, current_depth + 1, max_depth, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NATIVE_MANIFEST_WITH_SDK: &str = r#"// swift-tools-version:5.9
import PackageDescription

let package = Package(
    name: "Blinky",
    dependencies: [
        .package(url: "https://github.com/devdock/devdock-sdk.git", from: "0.4.0"),
    ],
    targets: [
        .executableTarget(name: "Blinky", dependencies: ["DevdockSDK"]),
        .executableTarget(
            name: "BlinkyCLI"
        ),
        .target(name: "BlinkyCore"),
    ]
)
"#;

    #[test]
    fn test_native_dependency_detection() {
        assert!(check_native_dependency(NATIVE_MANIFEST_WITH_SDK));
        assert!(!check_native_dependency(
            r#".package(url: "https://github.com/apple/swift-log.git", from: "1.0.0")"#
        ));
    }

    #[test]
    fn test_script_dependency_detection() {
        assert!(check_script_dependency("requests\ndevdock==0.3.1\n"));
        assert!(check_script_dependency("devdock\n"));
        assert!(check_script_dependency("devdock[gpio]>=0.2"));
        assert!(check_script_dependency(
            "[project]\ndependencies = [\n  \"devdock>=0.2\",\n]\n"
        ));
        assert!(!check_script_dependency("devdock-unrelated==1.0\n"));
        assert!(!check_script_dependency("numpy\n"));
    }

    #[test]
    fn test_parse_executable_targets() {
        let targets = parse_executable_targets(NATIVE_MANIFEST_WITH_SDK);
        let names: Vec<_> = targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Blinky", "BlinkyCLI"]);
    }

    #[test]
    fn test_detect_marker_config_file_wins() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "{}").unwrap();
        fs::write(temp.path().join(NATIVE_MANIFEST), NATIVE_MANIFEST_WITH_SDK).unwrap();
        assert_eq!(detect_marker(temp.path()), Some(ProjectMarker::ConfigFile));
    }

    #[test]
    fn test_detect_marker_manifests() {
        let native = tempdir().unwrap();
        fs::write(native.path().join(NATIVE_MANIFEST), NATIVE_MANIFEST_WITH_SDK).unwrap();
        assert_eq!(
            detect_marker(native.path()),
            Some(ProjectMarker::NativeManifest)
        );

        let script = tempdir().unwrap();
        fs::write(script.path().join("requirements.txt"), "devdock==1.0\n").unwrap();
        assert_eq!(
            detect_marker(script.path()),
            Some(ProjectMarker::ScriptManifest)
        );

        let plain = tempdir().unwrap();
        fs::write(plain.path().join("requirements.txt"), "flask\n").unwrap();
        assert_eq!(detect_marker(plain.path()), None);
    }

    #[test]
    fn test_target_runtime() {
        let temp = tempdir().unwrap();
        assert_eq!(target_runtime(temp.path()), TargetRuntime::Script);
        fs::write(temp.path().join(NATIVE_MANIFEST), "").unwrap();
        assert_eq!(target_runtime(temp.path()), TargetRuntime::Native);
    }

    #[test]
    fn test_manifest_targets_missing_manifest() {
        let temp = tempdir().unwrap();
        assert!(manifest_targets(temp.path()).is_empty());
    }

    #[test]
    fn test_discover_workspace_folders() {
        let temp = tempdir().unwrap();
        let app = temp.path().join("apps").join("blinky");
        let tool = temp.path().join("tools");
        let hidden = temp.path().join(".cache").join("pkg");
        let build = temp.path().join("build").join("pkg");
        for dir in [&app, &tool, &hidden, &build] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(app.join(NATIVE_MANIFEST), "").unwrap();
        fs::write(tool.join("pyproject.toml"), "").unwrap();
        fs::write(hidden.join(CONFIG_FILENAME), "{}").unwrap();
        fs::write(build.join(CONFIG_FILENAME), "{}").unwrap();

        let found = discover_workspace_folders(temp.path(), DEFAULT_MAX_DEPTH);
        assert_eq!(found, vec![app, tool]);
    }

    #[test]
    fn test_discover_base_is_project() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "{}").unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub").join(NATIVE_MANIFEST), "").unwrap();

        let found = discover_workspace_folders(temp.path(), DEFAULT_MAX_DEPTH);
        assert_eq!(found, vec![temp.path().to_path_buf()]);
    }
}
