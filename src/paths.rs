//! Centralized path resolution for pairscanner
//!
//! All file and directory paths are resolved through this module so the binaries
//! and tests agree on where config and logs live.
//!
//! ## Directory Structure
//!
//! ```text
//! <base>/
//! ├── data/
//! │   └── config.toml
//! └── logs/
//!     └── pairscanner.log
//! ```
//!
//! `<base>` is `$PAIRSCANNER_HOME` when set, otherwise the working directory.

use once_cell::sync::Lazy;
use std::path::PathBuf;

/// Environment variable overriding the base directory
pub const HOME_ENV_VAR: &str = "PAIRSCANNER_HOME";

static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

fn resolve_base_directory() -> PathBuf {
    match std::env::var(HOME_ENV_VAR) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("."),
    }
}

// =============================================================================
// PRIMARY DIRECTORY ACCESSORS
// =============================================================================

pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

/// Returns the data directory path (config files)
pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

/// Returns the logs directory path
pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

/// Returns the main configuration file path
pub fn get_config_path() -> PathBuf {
    get_data_directory().join("config.toml")
}

/// Returns the log file path
pub fn get_log_file_path() -> PathBuf {
    get_logs_directory().join("pairscanner.log")
}

/// Creates the data and logs directories if they are missing
pub fn ensure_all_directories() -> Result<(), String> {
    let dirs_to_create = vec![("data", get_data_directory()), ("logs", get_logs_directory())];

    for (name, dir) in dirs_to_create {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    dir.display(),
                    e
                )
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_directory_is_subdir() {
        assert!(get_data_directory().starts_with(get_base_directory()));
    }

    #[test]
    fn test_config_and_log_paths() {
        assert!(get_config_path().starts_with(get_data_directory()));
        assert!(get_log_file_path().starts_with(get_logs_directory()));
        assert!(get_config_path().ends_with("config.toml"));
    }
}
