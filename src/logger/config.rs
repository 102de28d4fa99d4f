/// Logger configuration derived from command-line flags
///
/// Stored in a global RwLock so every call site filters against the same
/// rules without threading a config value through the code.
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Highest level that is displayed (Info by default)
    pub min_level: LogLevel,
    /// When non-empty, only these tags log at Info/Warning
    pub enabled_tags: HashSet<String>,
    /// Tags with debug output enabled (from --debug-<tag>)
    pub debug_tags: HashSet<String>,
    /// Tags with verbose output enabled (from --verbose-<tag>)
    pub verbose_tags: HashSet<String>,
    /// Write a plain copy of every line to the log file
    pub file_enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            enabled_tags: HashSet::new(),
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            file_enabled: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a copy of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    match LOGGER_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(_) => LoggerConfig::default(),
    }
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut current) = LOGGER_CONFIG.write() {
        *current = config;
    }
}

/// Mutate the logger configuration in place
pub fn update_logger_config<F>(update: F)
where
    F: FnOnce(&mut LoggerConfig),
{
    if let Ok(mut current) = LOGGER_CONFIG.write() {
        update(&mut current);
    }
}

/// Build the logger configuration from the process arguments
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    if arguments::is_verbose_enabled() {
        config.min_level = LogLevel::Verbose;
    } else if !arguments::collect_prefixed_flags("debug-").is_empty() {
        config.min_level = LogLevel::Debug;
    } else if arguments::is_quiet_enabled() {
        config.min_level = LogLevel::Warning;
    }

    config.debug_tags = arguments::collect_prefixed_flags("debug-").into_iter().collect();
    config.verbose_tags = arguments::collect_prefixed_flags("verbose-")
        .into_iter()
        .collect();
    if !config.verbose_tags.is_empty() && config.min_level < LogLevel::Verbose {
        config.min_level = LogLevel::Verbose;
    }
    config.file_enabled = !arguments::is_no_log_file_enabled();

    set_logger_config(config);
}

/// Debug output for a tag requires its --debug-<tag> flag (or --verbose)
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    (config.min_level == LogLevel::Verbose && config.verbose_tags.is_empty())
        || config.debug_tags.contains(&tag.to_debug_key())
        || config.verbose_tags.contains(&tag.to_debug_key())
}

/// Verbose output for a tag requires --verbose-<tag>
pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config()
        .verbose_tags
        .contains(&tag.to_debug_key())
}
