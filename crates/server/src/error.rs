//! Server-side errors.
//!
//! [`HandlerError`] is what a registered source raises; the registry turns it
//! into `Error::Handler` so it crosses the wire as `{code, message}`.

use std::path::PathBuf;

use searchsync_core::{Error, WireError};

/// Error raised inside a registered search handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub code: Option<String>,
    pub message: String,
}

impl HandlerError {
    /// Unstructured failure; travels as `{message}` only.
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }

    /// Failure with a stable code the client can branch on.
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code.into()), message: message.into() }
    }
}

impl From<HandlerError> for Error {
    fn from(err: HandlerError) -> Self {
        Error::Handler(WireError { code: err.code, message: err.message })
    }
}

/// Failures loading server resources at startup.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to read corpus {path}: {source}")]
    CorpusRead { path: PathBuf, source: std::io::Error },

    #[error("failed to parse corpus {path}: {source}")]
    CorpusParse { path: PathBuf, source: serde_json::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coded_handler_error_keeps_code() {
        let err: Error = HandlerError::coded("QUOTA", "quota exceeded").into();
        assert_eq!(err.to_wire(), WireError::coded("QUOTA", "quota exceeded"));
    }

    #[test]
    fn test_plain_handler_error_has_message_only() {
        let err: Error = HandlerError::new("boom").into();
        let wire = err.to_wire();
        assert!(wire.code.is_none());
        assert_eq!(wire.message, "boom");
    }
}
