//! Plain request/response fallback transport.
//!
//! POSTs a [`RequestEnvelope`] to `{endpoint}/_search-source` and decodes the
//! [`ResponseEnvelope`] that comes back. Errors carried inside the envelope
//! are rebuilt into the matching [`Error`] variant.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url, header};
use searchsync_core::wire::{CALLER_HEADER, CONTENT_TYPE};
use searchsync_core::{AppConfig, Error, Payload, RequestEnvelope, ResponseEnvelope, SearchOptions};

use super::{Fetcher, endpoint_url};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Base URL of the remote endpoint (default: "http://127.0.0.1:3700")
    pub endpoint: String,

    /// User agent string (default: "searchsync/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Caller identity sent in the `x-search-caller` header
    pub caller: Option<String>,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self { endpoint: "http://127.0.0.1:3700".to_string(), user_agent: "searchsync/0.1".to_string(), timeout: None, caller: None }
    }
}

impl From<&AppConfig> for HttpFetcherConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            caller: None,
        }
    }
}

/// Fetcher speaking the request/response wire format over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    url: Url,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher with the given configuration.
    pub fn new(config: HttpFetcherConfig) -> Result<Self, Error> {
        let url = endpoint_url(&config.endpoint).map_err(|e| Error::Validation(format!("endpoint: {e}")))?;

        let mut builder = Client::builder().user_agent(&config.user_agent).use_rustls_tls().gzip(true).brotli(true).deflate(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, url, config })
    }

    /// Fully resolved endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn encode(source: &str, query: Option<&str>, options: &SearchOptions) -> Result<Vec<u8>, Error> {
        let envelope = RequestEnvelope { source: source.to_string(), query: query.map(String::from), options: options.clone() };
        serde_json::to_vec(&envelope).map_err(|e| Error::Validation(format!("failed to encode request: {e}")))
    }

    fn decode(bytes: &[u8]) -> Result<Payload, Error> {
        let envelope: ResponseEnvelope =
            serde_json::from_slice(bytes).map_err(|e| Error::Transport(format!("malformed response: {e}")))?;
        envelope.into_result()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &str, query: Option<&str>, options: &SearchOptions) -> Result<Payload, Error> {
        let start = Instant::now();
        let body = Self::encode(source, query, options)?;

        let mut request = self
            .http
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, CONTENT_TYPE)
            .header(header::ACCEPT, CONTENT_TYPE)
            .body(body);
        if let Some(caller) = &self.config.caller {
            request = request.header(CALLER_HEADER, caller);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Transport(format!("request timed out: {e}"))
            } else {
                Error::Transport(format!("network error: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("status {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?;

        let payload = Self::decode(&bytes)?;

        tracing::debug!(source, rows = payload.len(), elapsed_ms = start.elapsed().as_millis() as u64, "fetched over http");

        Ok(payload)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
