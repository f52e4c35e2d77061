//! Unified error types for search-source synchronization.
//!
//! Every failure a coordinator can observe falls into one of four buckets:
//! transport, unknown source, handler failure, or malformed request.

use std::fmt;

use rmcp::model::{ErrorCode, ErrorData as McpError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const TRANSPORT_CODE: &str = "TRANSPORT_ERROR";
const SOURCE_NOT_FOUND_CODE: &str = "SOURCE_NOT_FOUND";
const VALIDATION_CODE: &str = "VALIDATION_ERROR";
const HANDLER_CODE: &str = "HANDLER_ERROR";

const SOURCE_NOT_FOUND_PREFIX: &str = "no such search source: ";

/// Structured error that crosses the wire.
///
/// Handler failures that carry a code travel as `{code, message}`; unstructured
/// failures fall back to `{message}` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WireError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl WireError {
    /// An error with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }

    /// An error with a machine-readable code.
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code.into()), message: message.into() }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Unified error type for search sources, fetchers and the server registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Network or transport failure while reaching the remote source.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// The requested source name is not registered.
    #[error("SOURCE_NOT_FOUND: no such search source: {0}")]
    SourceNotFound(String),

    /// A registered handler raised an error.
    #[error("HANDLER_ERROR: {0}")]
    Handler(WireError),

    /// Malformed query or options.
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),
}

impl Error {
    /// Stable code for this error's category.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Transport(_) => TRANSPORT_CODE,
            Error::SourceNotFound(_) => SOURCE_NOT_FOUND_CODE,
            Error::Handler(_) => HANDLER_CODE,
            Error::Validation(_) => VALIDATION_CODE,
        }
    }

    /// Convert into the structured form sent across the wire.
    ///
    /// Handler errors are passed through untouched so their own code (or lack
    /// of one) survives the trip.
    pub fn to_wire(&self) -> WireError {
        match self {
            Error::Transport(msg) => WireError::coded(TRANSPORT_CODE, msg.clone()),
            Error::SourceNotFound(name) => {
                WireError::coded(SOURCE_NOT_FOUND_CODE, format!("{SOURCE_NOT_FOUND_PREFIX}{name}"))
            }
            Error::Handler(wire) => wire.clone(),
            Error::Validation(msg) => WireError::coded(VALIDATION_CODE, msg.clone()),
        }
    }

    /// Rebuild an error from its wire form.
    ///
    /// Unknown or missing codes are treated as handler errors.
    pub fn from_wire(wire: WireError) -> Self {
        match wire.code.as_deref() {
            Some(TRANSPORT_CODE) => Error::Transport(wire.message),
            Some(SOURCE_NOT_FOUND_CODE) => {
                let name = wire.message.strip_prefix(SOURCE_NOT_FOUND_PREFIX).unwrap_or(&wire.message);
                Error::SourceNotFound(name.to_string())
            }
            Some(VALIDATION_CODE) => Error::Validation(wire.message),
            _ => Error::Handler(wire),
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::Validation(msg) => (-32602, msg.clone()),
            Error::SourceNotFound(_) => (-32001, err.to_wire().message),
            Error::Handler(wire) => (-32002, wire.to_string()),
            Error::Transport(msg) => (-32003, msg.clone()),
        };

        let data = serde_json::to_value(err.to_wire()).ok();
        McpError { code: ErrorCode(code), message: message.into(), data }
    }
}

/// Rebuild an error answered by the persistent-connection transport.
///
/// The wire form carried in `data` wins; without it the JSON-RPC code picks
/// the category.
impl From<McpError> for Error {
    fn from(err: McpError) -> Self {
        if let Some(wire) = err.data.and_then(|data| serde_json::from_value::<WireError>(data).ok()) {
            return Error::from_wire(wire);
        }
        let message = err.message.into_owned();
        match err.code.0 {
            -32602 => Error::Validation(message),
            -32001 => Error::from_wire(WireError::coded(SOURCE_NOT_FOUND_CODE, message)),
            -32003 => Error::Transport(message),
            _ => Error::Handler(WireError::message(message)),
        }
    }
}
