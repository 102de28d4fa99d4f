/// Error types for the scanner subsystem
///
/// Nothing here is fatal to the process: transport errors are absorbed by the
/// reconnect loop, fetch errors are stored on the list that issued the fetch,
/// and malformed live messages are logged and dropped.
use thiserror::Error;

/// Failure of a single snapshot page request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP error! status: {status} ({endpoint}): {body}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("Failed to parse response from {endpoint}: {reason}")]
    Parse { endpoint: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScannerError {
    #[error("Transport error ({endpoint}): {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed '{event}' message: {reason}")]
    MessageParse { event: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    pub fn endpoint(&self) -> &str {
        match self {
            FetchError::HttpStatus { endpoint, .. }
            | FetchError::Request { endpoint, .. }
            | FetchError::Parse { endpoint, .. } => endpoint,
        }
    }

    /// Server-side failures and dropped requests are worth a manual refresh,
    /// a 4xx usually means the filter itself was rejected
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            FetchError::Request { .. } => true,
            FetchError::Parse { .. } => false,
        }
    }
}

impl ScannerError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            ScannerError::Transport { .. } => true,
            ScannerError::Fetch(e) => e.is_retryable(),
            ScannerError::MessageParse { .. } => true,
            ScannerError::Config(_) => false,
        }
    }

    pub fn message_parse(event: impl Into<String>, reason: impl ToString) -> Self {
        ScannerError::MessageParse {
            event: event.into(),
            reason: reason.to_string(),
        }
    }
}

pub type ScannerResult<T> = Result<T, ScannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_matches_list_error() {
        let err = FetchError::HttpStatus {
            endpoint: "/scanner".to_string(),
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(err.to_string().starts_with("HTTP error! status: 502"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_recoverability() {
        let parse = ScannerError::Fetch(FetchError::Parse {
            endpoint: "/scanner".to_string(),
            reason: "expected value".to_string(),
        });
        assert!(!parse.is_recoverable());
        assert!(!ScannerError::Config("bad url".to_string()).is_recoverable());
        assert!(ScannerError::message_parse("tick", "missing swaps").is_recoverable());
        assert!(ScannerError::Transport {
            endpoint: "ws://localhost".to_string(),
            reason: "refused".to_string()
        }
        .is_recoverable());
    }
}
