//! The fetch contract and its transports.
//!
//! A [`Fetcher`] answers "give me data for (source, query, options)" with a
//! [`Payload`] or an [`Error`]. The coordinator only ever sees this trait;
//! which transport actually carries the call is decided by
//! [`TransportSelector`]:
//!
//! 1. a custom in-process handler, when one is configured
//! 2. the persistent-connection transport ([`McpFetcher`]), while it reports
//!    itself available
//! 3. the plain request/response fallback ([`HttpFetcher`])

pub mod http;
pub mod local;
pub mod mcp;
pub mod url;

use std::sync::Arc;

use async_trait::async_trait;
use searchsync_core::{Error, Payload, SearchOptions};

pub use self::http::{HttpFetcher, HttpFetcherConfig};
pub use self::local::LocalFetcher;
pub use self::mcp::{McpFetcher, McpFetcherConfig};
pub use self::url::{UrlError, endpoint_url};

/// Asynchronous "get me data" contract.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &str, query: Option<&str>, options: &SearchOptions) -> Result<Payload, Error>;

    /// Whether this transport can currently carry a call.
    fn is_available(&self) -> bool {
        true
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Environment-driven choice between transports.
pub struct TransportSelector {
    custom: Option<Arc<dyn Fetcher>>,
    connected: Option<Arc<dyn Fetcher>>,
    fallback: Arc<dyn Fetcher>,
}

impl TransportSelector {
    pub fn new(fallback: Arc<dyn Fetcher>) -> Self {
        Self { custom: None, connected: None, fallback }
    }

    /// Route every call through a custom in-process handler.
    pub fn with_custom(mut self, custom: Arc<dyn Fetcher>) -> Self {
        self.custom = Some(custom);
        self
    }

    /// Prefer a persistent-connection transport while it is available.
    pub fn with_connected(mut self, connected: Arc<dyn Fetcher>) -> Self {
        self.connected = Some(connected);
        self
    }

    fn select(&self) -> &Arc<dyn Fetcher> {
        if let Some(custom) = &self.custom {
            return custom;
        }
        match &self.connected {
            Some(connected) if connected.is_available() => connected,
            _ => &self.fallback,
        }
    }
}

#[async_trait]
impl Fetcher for TransportSelector {
    async fn fetch(&self, source: &str, query: Option<&str>, options: &SearchOptions) -> Result<Payload, Error> {
        let transport = self.select();
        tracing::debug!(transport = transport.name(), source, "dispatching fetch");
        transport.fetch(source, query, options).await
    }

    fn is_available(&self) -> bool {
        self.select().is_available()
    }

    fn name(&self) -> &'static str {
        "selector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchsync_core::Document;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Named {
        name: &'static str,
        available: AtomicBool,
    }

    impl Named {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, available: AtomicBool::new(true) })
        }
    }

    #[async_trait]
    impl Fetcher for Named {
        async fn fetch(&self, _: &str, _: Option<&str>, _: &SearchOptions) -> Result<Payload, Error> {
            Ok(Payload::Documents(vec![Document::new(self.name)]))
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    async fn answered_by(selector: &TransportSelector) -> String {
        let payload = selector.fetch("people", None, &SearchOptions::default()).await.unwrap();
        let (docs, _) = payload.into_parts();
        docs[0].key()
    }

    #[tokio::test]
    async fn test_fallback_only() {
        let selector = TransportSelector::new(Named::new("http"));
        assert_eq!(answered_by(&selector).await, "http");
    }

    #[tokio::test]
    async fn test_connected_preferred_while_available() {
        let connected = Named::new("socket");
        let selector = TransportSelector::new(Named::new("http")).with_connected(connected.clone());
        assert_eq!(answered_by(&selector).await, "socket");

        connected.available.store(false, Ordering::SeqCst);
        assert_eq!(answered_by(&selector).await, "http");
    }

    #[tokio::test]
    async fn test_custom_wins() {
        let selector = TransportSelector::new(Named::new("http"))
            .with_connected(Named::new("socket"))
            .with_custom(Named::new("custom"));
        assert_eq!(answered_by(&selector).await, "custom");
    }
}
