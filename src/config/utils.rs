/// Configuration utilities - loading, saving, and access helpers
///
/// - Loading configuration from disk (missing file = defaults)
/// - Writing a config file (used by `debug_scanner --write-config`)
/// - Thread-safe access helpers
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::schemas::Config;
use crate::arguments::{get_config_path_override, is_debug_config_enabled};
use crate::logger::{self, LogTag};
use crate::paths;

/// Global configuration instance
///
/// This is the single source of truth for all configuration values.
/// Access it using the helper functions below.
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Config file in effect: `--config <path>` or `data/config.toml`
pub fn resolve_config_path() -> PathBuf {
    get_config_path_override()
        .map(PathBuf::from)
        .unwrap_or_else(paths::get_config_path)
}

/// Parse and validate configuration text
pub fn parse_config(contents: &str) -> Result<Config, String> {
    let config = toml::from_str::<Config>(contents)
        .map_err(|e| format!("Failed to parse config: {}", e))?;
    config
        .validate()
        .map_err(|e| format!("Invalid config: {}", e))?;
    Ok(config)
}

/// Read a config file without touching the global instance
///
/// A missing file yields the defaults.
pub fn read_config_file(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path.display()),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
    parse_config(&contents).map_err(|e| format!("{} ('{}')", e, path.display()))
}

/// Load configuration from disk and initialize the global CONFIG
///
/// This should be called once at startup.
pub fn load_config() -> Result<(), String> {
    load_config_from_path(&resolve_config_path())
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &Path) -> Result<(), String> {
    let config = read_config_file(path)?;

    if is_debug_config_enabled() {
        logger::debug(
            LogTag::Config,
            &format!(
                "Loaded config from '{}': api={} session={} backoff={:?}",
                path.display(),
                config.api.base_url,
                config.session.url,
                config.session.backoff
            ),
        );
    }

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

/// Access configuration with a closure
///
/// Falls back to defaults when `load_config()` has not run.
///
/// # Example
/// ```
/// use pairscanner::config::with_config;
///
/// let timeout = with_config(|cfg| cfg.api.timeout_secs);
/// assert!(timeout > 0);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get() {
        Some(lock) => {
            let config = lock.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&config)
        }
        None => f(&Config::default()),
    }
}

/// Get a clone of the entire configuration
///
/// Useful when values must be held across await points.
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

/// Write a configuration to disk as TOML, creating parent directories
pub fn save_config(config: &Config, path: &Path) -> Result<(), String> {
    let config_str =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    std::fs::write(path, config_str)
        .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

    logger::info(LogTag::Config, &format!("Config written to '{}'", path.display()));
    Ok(())
}

/// Check if configuration has been initialized
pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}
