//! Core types and shared functionality for searchsync.
//!
//! This crate provides:
//! - Documents with normalized identifiers
//! - Search options, row windows and stable cache keys
//! - Wire envelopes for the request/response transport
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod document;
pub mod error;
pub mod key;
pub mod request;
pub mod wire;

pub use config::{AppConfig, ConfigError, ServerTransport};
pub use document::{DocId, Document};
pub use error::{Error, WireError};
pub use key::CacheKey;
pub use request::{SearchOptions, SortField, SortOrder, Window};
pub use wire::{Payload, RequestEnvelope, ResponseEnvelope};
