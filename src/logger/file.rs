/// Plain-text log file output
///
/// Lines are appended to `logs/pairscanner.log`. Until `init_file_logging`
/// succeeds every write is a no-op, which keeps tests and the debug binary
/// console-only.
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Mutex;

use super::config::get_logger_config;
use crate::paths;

static LOG_FILE: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

/// Open the log file for appending
pub fn init_file_logging() {
    if !get_logger_config().file_enabled {
        return;
    }

    let path = paths::get_log_file_path();
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {}", parent.display(), e);
            return;
        }
    }

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            if let Ok(mut guard) = LOG_FILE.lock() {
                *guard = Some(BufWriter::new(file));
            }
        }
        Err(e) => eprintln!("Failed to open log file {}: {}", path.display(), e),
    }
}

/// Append one line to the log file
pub fn write_to_file(line: &str) {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(writer) = guard.as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

/// Flush buffered lines to disk
pub fn flush_file_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(writer) = guard.as_mut() {
            let _ = writer.flush();
        }
    }
}
