/// Centralized argument handling for the scanner binaries
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for each module
/// - Unified argument parsing utilities
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by binaries and tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

/// All flags of the form `--<prefix><name>` with the prefix stripped
pub fn collect_prefixed_flags(prefix: &str) -> Vec<String> {
    let full_prefix = format!("--{}", prefix);
    get_cmd_args()
        .iter()
        .filter_map(|arg| arg.strip_prefix(&full_prefix))
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.to_string())
        .collect()
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Snapshot API debug mode
pub fn is_debug_api_enabled() -> bool {
    has_arg("--debug-api")
}

/// Live session (websocket) debug mode
pub fn is_debug_session_enabled() -> bool {
    has_arg("--debug-session")
}

/// List controller / reconciliation debug mode
pub fn is_debug_scanner_enabled() -> bool {
    has_arg("--debug-scanner")
}

/// Filter predicate debug mode (logs every rejection reason)
pub fn is_debug_filtering_enabled() -> bool {
    has_arg("--debug-filtering")
}

/// Configuration debug mode
pub fn is_debug_config_enabled() -> bool {
    has_arg("--debug-config")
}

/// Verbose mode for all tags
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Quiet mode (warnings and errors only)
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

/// Disable writing log lines to the log file
pub fn is_no_log_file_enabled() -> bool {
    has_arg("--no-log-file")
}

/// Custom config file path
pub fn get_config_path_override() -> Option<String> {
    get_arg_value("--config")
}

pub mod patterns {
    use super::has_arg;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu with all available flags and their descriptions
pub fn print_help() {
    println!("pairscanner - live trending / new pair lists");
    println!();
    println!("USAGE:");
    println!("    pairscanner [FLAGS]");
    println!();
    println!("CORE FLAGS:");
    println!("    --config <path>           Load configuration from <path> (default data/config.toml)");
    println!("    --help, -h                Show this help message");
    println!("    --quiet                   Only show warnings and errors");
    println!("    --verbose                 Show verbose logs for every module");
    println!("    --no-log-file             Do not write logs/pairscanner.log");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-api               Snapshot API debug mode");
    println!("    --debug-config            Configuration debug mode");
    println!("    --debug-filtering         Filter predicate debug mode");
    println!("    --debug-scanner           List controller debug mode");
    println!("    --debug-session           Live session debug mode");
    println!();
    println!("EXAMPLES:");
    println!("    pairscanner                                  # Run with data/config.toml");
    println!("    pairscanner --config local.toml              # Run with a custom config");
    println!("    pairscanner --debug-session --debug-scanner  # Trace live updates");
}

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_api_enabled() {
        modes.push("api");
    }
    if is_debug_config_enabled() {
        modes.push("config");
    }
    if is_debug_filtering_enabled() {
        modes.push("filtering");
    }
    if is_debug_scanner_enabled() {
        modes.push("scanner");
    }
    if is_debug_session_enabled() {
        modes.push("session");
    }
    if is_verbose_enabled() {
        modes.push("verbose");
    }

    modes
}

/// Checks if any debug mode is enabled
pub fn is_any_debug_enabled() -> bool {
    !get_enabled_debug_modes().is_empty()
}

/// Prints debug information about current arguments and enabled debug modes
pub fn print_debug_info() {
    if !is_any_debug_enabled() {
        return;
    }
    println!("Command-line arguments: {:?}", get_cmd_args());
    println!("Enabled debug modes: {:?}", get_enabled_debug_modes());
}
