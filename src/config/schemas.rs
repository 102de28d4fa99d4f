/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides:
/// - Single-source definition (no repetition)
/// - Embedded defaults
/// - Serde support
use serde::{Deserialize, Serialize};

use crate::config_struct;
use crate::scanner::filters::FilterSpec;
use crate::scanner::sort::SortConfig;

// ============================================================================
// SNAPSHOT API
// ============================================================================

config_struct! {
    /// Snapshot API configuration
    pub struct ApiConfig {
        /// Base URL; pages are fetched from `{base_url}/scanner`
        base_url: String = "http://localhost:3000".to_string(),
        timeout_secs: u64 = 10,
    }
}

// ============================================================================
// LIVE SESSION
// ============================================================================

/// Reconnect delay policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    #[default]
    Fixed,
    Exponential,
}

config_struct! {
    /// Live websocket session configuration
    pub struct SessionConfig {
        url: String = "ws://localhost:3000/ws".to_string(),

        // Reconnect policy
        reconnect_delay_ms: u64 = 3000,
        backoff: BackoffMode = BackoffMode::Fixed,
        max_reconnect_delay_ms: u64 = 30_000,
        jitter: bool = false,
    }
}

// ============================================================================
// LISTS
// ============================================================================

config_struct! {
    /// Initial filter and sort of both lists
    pub struct ListsConfig {
        trending_filter: FilterSpec = FilterSpec::trending(),
        trending_sort: SortConfig = SortConfig::trending_default(),
        new_filter: FilterSpec = FilterSpec::new_pairs(),
        new_sort: SortConfig = SortConfig::new_pairs_default(),
    }
}

// ============================================================================
// DISPLAY
// ============================================================================

config_struct! {
    /// Headless summary output
    pub struct DisplayConfig {
        summary_interval_secs: u64 = 15,
        summary_rows: usize = 5,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        api: ApiConfig = ApiConfig::default(),
        session: SessionConfig = SessionConfig::default(),
        lists: ListsConfig = ListsConfig::default(),
        display: DisplayConfig = DisplayConfig::default(),
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

fn validate_url(label: &str, value: &str, schemes: &[&str]) -> Result<(), String> {
    let parsed =
        url::Url::parse(value).map_err(|e| format!("{} '{}' is not a valid URL: {}", label, value, e))?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(format!(
            "{} '{}' must use one of: {}",
            label,
            value,
            schemes.join(", ")
        ));
    }
    Ok(())
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_url("api.base_url", &self.base_url, &["http", "https"])?;
        if self.timeout_secs == 0 {
            return Err("api.timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_url("session.url", &self.url, &["ws", "wss"])?;
        if self.reconnect_delay_ms == 0 {
            return Err("session.reconnect_delay_ms must be > 0".to_string());
        }
        if self.backoff == BackoffMode::Exponential
            && self.max_reconnect_delay_ms < self.reconnect_delay_ms
        {
            return Err(
                "session.max_reconnect_delay_ms must be >= reconnect_delay_ms".to_string(),
            );
        }
        Ok(())
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.summary_interval_secs == 0 {
            return Err("display.summary_interval_secs must be > 0".to_string());
        }
        Ok(())
    }
}

impl Config {
    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.api.validate()?;
        self.session.validate()?;
        self.display.validate()?;
        Ok(())
    }
}
