//! Request status and coordinator options.

use std::fmt;
use std::time::Duration;

use searchsync_core::{AppConfig, WireError};

/// Status of the most recently issued request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    Loading,
    #[default]
    Loaded,
    Error(WireError),
}

impl Status {
    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Status::Loaded)
    }

    pub fn error(&self) -> Option<&WireError> {
        match self {
            Status::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Loading => f.write_str("loading"),
            Status::Loaded => f.write_str("loaded"),
            Status::Error(err) => write!(f, "error: {err}"),
        }
    }
}

/// Per-source behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceOptions {
    /// History TTL; `None` disables history keeping.
    pub keep_history: Option<Duration>,
    /// Emit a mirror change right after `search` so views can client-filter
    /// stale rows while the request is in flight.
    pub local_search: bool,
}

impl SourceOptions {
    pub fn with_history(mut self, ttl: Duration) -> Self {
        self.keep_history = Some(ttl);
        self
    }

    pub fn with_local_search(mut self, enabled: bool) -> Self {
        self.local_search = enabled;
        self
    }
}

impl From<&AppConfig> for SourceOptions {
    fn from(config: &AppConfig) -> Self {
        Self { keep_history: config.keep_history(), local_search: config.local_search }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_default_is_loaded() {
        assert!(Status::default().is_loaded());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Loading.to_string(), "loading");
        assert_eq!(Status::Error(WireError::message("boom")).to_string(), "error: boom");
    }

    #[test]
    fn test_options_from_config() {
        let config = AppConfig { keep_history_ms: Some(30_000), local_search: true, ..Default::default() };
        let options = SourceOptions::from(&config);
        assert_eq!(options.keep_history, Some(Duration::from_secs(30)));
        assert!(options.local_search);

        assert_eq!(SourceOptions::from(&AppConfig::default()), SourceOptions::default());
    }
}
