/// Log tags identify which subsystem produced a line
///
/// Each tag maps to a `--debug-<key>` command-line flag that enables its
/// debug output.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Api,
    Session,
    Scanner,
    Filtering,
    Summary,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used for `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Api => "api".to_string(),
            LogTag::Session => "session".to_string(),
            LogTag::Scanner => "scanner".to_string(),
            LogTag::Filtering => "filtering".to_string(),
            LogTag::Summary => "summary".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Api => "API".to_string(),
            LogTag::Session => "SESSION".to_string(),
            LogTag::Scanner => "SCANNER".to_string(),
            LogTag::Filtering => "FILTER".to_string(),
            LogTag::Summary => "SUMMARY".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(s) => s.to_uppercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
