//! Configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/atf/` and `~/.local/share/atf/`
//! - macOS: `~/Library/Application Support/atf/`
//! - Windows: `%APPDATA%\atf\`

use std::io;
use std::path::{Path, PathBuf};

/// Name used for the application directories
const APP_NAME: &str = "atf";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the data directory (reports, baselines, logs)
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join("logs"))
}

/// Default directory for finalized reports
pub fn default_report_dir() -> PathBuf {
    data_dir()
        .map(|d| d.join("reports"))
        .unwrap_or_else(|| PathBuf::from("reports"))
}

/// Default directory for persisted case baselines
pub fn default_baseline_dir() -> PathBuf {
    data_dir()
        .map(|d| d.join("baselines"))
        .unwrap_or_else(|| PathBuf::from("baselines"))
}

/// Default workspace for checked-out tasks and cases
pub fn default_workspace_dir() -> PathBuf {
    PathBuf::from("atf-workspace")
}

/// Ensure the parent directory of a file exists
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Replace characters that are unsafe in file names
pub fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn test_sanitize_file_component() {
        assert_eq!(sanitize_file_component("case/12 v2"), "case_12_v2");
        assert_eq!(sanitize_file_component("ci-nightly_1.0"), "ci-nightly_1.0");
    }

    #[test]
    fn test_ensure_parent_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a").join("b").join("report.json");
        ensure_parent(&file).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }
}
