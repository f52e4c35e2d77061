//! Client side of searchsync.
//!
//! This crate holds the synchronization engine: the history cache with range
//! merging, the in-memory mirror and its reconciliation, the versioned
//! [`SearchSource`] coordinator with its query result view, and the
//! [`Fetcher`] transports used to reach a remote source.

pub mod fetch;
pub mod history;
pub mod mirror;
pub mod observer;
pub mod pattern;
pub mod source;

pub use fetch::{Fetcher, HttpFetcher, HttpFetcherConfig, LocalFetcher, McpFetcher, McpFetcherConfig, TransportSelector};
pub use history::{CacheEntry, HistoryCache, Range};
pub use mirror::{MirrorStore, ReconcileStats, Selector};
pub use observer::{Subject, SubscriptionId};
pub use pattern::{build_regex, escape_query};
pub use source::{FieldTransform, LiveView, SearchHandle, SearchSource, SourceOptions, Status, Versions, ViewOptions};
