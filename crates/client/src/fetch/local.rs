//! Custom in-process handler.

use std::fmt;

use async_trait::async_trait;
use searchsync_core::{Error, Payload, SearchOptions};

type Handler = dyn Fn(Option<&str>, &SearchOptions) -> Result<Payload, Error> + Send + Sync;

/// Fetcher backed by a closure running in the calling process.
///
/// The closure is synchronous; its result is still delivered through the
/// asynchronous [`Fetcher`](super::Fetcher) contract, so callers never see
/// a completion before `fetch` has been awaited.
pub struct LocalFetcher {
    handler: Box<Handler>,
}

impl LocalFetcher {
    pub fn new(handler: impl Fn(Option<&str>, &SearchOptions) -> Result<Payload, Error> + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler) }
    }
}

impl fmt::Debug for LocalFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFetcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl super::Fetcher for LocalFetcher {
    async fn fetch(&self, _source: &str, query: Option<&str>, options: &SearchOptions) -> Result<Payload, Error> {
        tokio::task::yield_now().await;
        (self.handler)(query, options)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetcher;
    use searchsync_core::Document;

    #[tokio::test]
    async fn test_local_fetcher_passes_arguments() {
        let fetcher = LocalFetcher::new(|query, options| {
            let id = format!("{}:{}", query.unwrap_or("-"), options.limit.unwrap_or(0));
            Ok(Payload::Documents(vec![Document::new(id)]))
        });

        let payload = fetcher.fetch("people", Some("alice"), &SearchOptions::default().with_limit(3)).await.unwrap();
        let (docs, _) = payload.into_parts();
        assert_eq!(docs[0].key(), "alice:3");
    }

    #[tokio::test]
    async fn test_local_fetcher_propagates_errors() {
        let fetcher = LocalFetcher::new(|_, _| Err(Error::Validation("bad".into())));
        let result = fetcher.fetch("people", None, &SearchOptions::default()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
