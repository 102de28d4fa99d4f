//! Structured logging system for pairscanner
//!
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Dual output: colored console + file persistence
//!
//! ## Usage
//!
//! ```rust
//! use pairscanner::logger::{self, LogTag};
//!
//! logger::error(LogTag::Api, "Snapshot request failed");
//! logger::warning(LogTag::Session, "Connection closed, reconnecting");
//! logger::info(LogTag::Scanner, "trending refreshed");
//! logger::debug(LogTag::Session, "raw frame: ..."); // Only if --debug-session
//! ```
//!
//! Call `logger::init()` once at startup, before any services run.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Parses command-line arguments for debug flags, then opens the log file.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (shown unless filtered by enabled tags)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations, hidden by --quiet)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when the --debug-<module> flag for the tag is provided.
///
/// # Example
/// ```rust
/// use pairscanner::logger::{self, LogTag};
///
/// // Only shown with --debug-session flag
/// logger::debug(LogTag::Session, "subscribe-pair sent");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose or --verbose-<module>)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Check whether a debug line for this tag would be printed
///
/// Lets call sites skip building expensive messages.
pub fn is_debug_enabled(tag: LogTag) -> bool {
    core::should_log(&tag, LogLevel::Debug)
}

/// Force flush all pending log writes
pub fn flush() {
    file::flush_file_logging();
}
