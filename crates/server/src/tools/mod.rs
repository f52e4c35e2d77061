//! MCP tool implementations.
//!
//! This module contains all tools exposed over the persistent stdio transport.

pub mod search_source;

pub use search_source::SearchSourceParams;
