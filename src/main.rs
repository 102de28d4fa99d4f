use pairscanner::{
    arguments::{patterns, print_debug_info, print_help},
    logger::{self, LogTag},
};

/// Headless entry point: runs both scanner lists until Ctrl+C
#[tokio::main]
async fn main() {
    // Logger needs the logs directory before it can open its file
    if let Err(e) = pairscanner::paths::ensure_all_directories() {
        eprintln!("❌ Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "🚀 pairscanner starting up...");
    print_debug_info();

    if let Err(e) = pairscanner::run::run_scanner().await {
        logger::error(LogTag::System, &format!("pairscanner failed: {:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::flush();
}
