// ABOUTME: XDG Base Directory paths for cross-platform config and data storage
// ABOUTME: Provides standardized paths for logs, the task database, and configuration

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application identifier for XDG directories
const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "courier";
const APPLICATION: &str = "courier";

/// Get XDG-compliant directories for the application
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// Get the data directory path (e.g., ~/.local/share/courier/)
/// Falls back to ./data if XDG directories unavailable
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Get the log directory path (inside data dir)
/// e.g., ~/.local/share/courier/logs/
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Default SQLite task database
/// e.g., ~/.local/share/courier/tasks.db
pub fn task_db_file() -> PathBuf {
    data_dir().join("tasks.db")
}

/// Get the config directory path (e.g., ~/.config/courier/)
/// Falls back to current directory if XDG directories unavailable
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default config file path
/// e.g., ~/.config/courier/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Expand tilde (~) to home directory in paths
/// Logs a warning if expansion fails and falls back to the original path
pub fn expand_tilde(path: &str) -> String {
    let rest = match path {
        "~" => "",
        _ => match path.strip_prefix("~/") {
            Some(rest) => rest,
            None => return path.to_string(),
        },
    };
    match directories::BaseDirs::new() {
        Some(base_dirs) => base_dirs
            .home_dir()
            .join(rest)
            .to_string_lossy()
            .to_string(),
        None => {
            tracing::warn!(
                path = %path,
                "Failed to expand tilde in path: could not determine home directory"
            );
            path.to_string()
        }
    }
}
