//! Persistent-connection transport.
//!
//! Holds one MCP session to a searchsync server and answers every fetch with
//! a `search_source` tool call. On success the tool's text content is a
//! `{"data": ...}` response envelope; failures come back as JSON-RPC errors
//! whose `data` carries the wire error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::{Peer, RoleClient, RunningService, ServiceError, serve_client};
use rmcp::transport::{IntoTransport, TokioChildProcess};
use searchsync_core::{Error, Payload, ResponseEnvelope, SearchOptions, WireError};
use serde_json::json;
use tokio::process::Command;

use super::Fetcher;

/// Name of the tool every fetch calls.
pub const TOOL_NAME: &str = "search_source";

/// How to start the server process for [`McpFetcher::spawn`].
#[derive(Debug, Clone)]
pub struct McpFetcherConfig {
    /// Server executable (default: "searchsync-server")
    pub command: String,

    /// Extra arguments for the server
    pub args: Vec<String>,

    /// Caller identity passed with every call
    pub caller: Option<String>,
}

impl Default for McpFetcherConfig {
    fn default() -> Self {
        Self { command: "searchsync-server".to_string(), args: Vec::new(), caller: None }
    }
}

/// Fetcher calling the `search_source` tool over an open MCP session.
pub struct McpFetcher {
    peer: Peer<RoleClient>,
    session: Mutex<Option<RunningService<RoleClient, ()>>>,
    connected: AtomicBool,
    caller: Option<String>,
}

impl McpFetcher {
    /// Start the server as a child process speaking MCP on stdio and connect to it.
    pub async fn spawn(config: McpFetcherConfig) -> Result<Self, Error> {
        let mut command = Command::new(&config.command);
        command.args(&config.args).env("SEARCHSYNC_TRANSPORT", "stdio");

        let transport = TokioChildProcess::new(command)
            .map_err(|e| Error::Transport(format!("failed to start {}: {e}", config.command)))?;

        let fetcher = Self::connect(transport, config.caller).await?;
        tracing::info!(command = %config.command, "connected to search server over stdio");
        Ok(fetcher)
    }

    /// Run the client handshake over any MCP transport.
    pub async fn connect<T, E, A>(transport: T, caller: Option<String>) -> Result<Self, Error>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let session = serve_client((), transport)
            .await
            .map_err(|e| Error::Transport(format!("handshake failed: {e}")))?;

        Ok(Self {
            peer: session.peer().clone(),
            session: Mutex::new(Some(session)),
            connected: AtomicBool::new(true),
            caller,
        })
    }

    /// End the session. The fetcher reports itself unavailable afterwards.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let session = self.session.lock().take();
        if let Some(session) = session
            && let Err(e) = session.cancel().await
        {
            tracing::warn!(error = %e, "search server session did not shut down cleanly");
        }
    }

    fn request(source: &str, query: Option<&str>, options: &SearchOptions, caller: Option<&str>) -> Result<CallToolRequestParam, Error> {
        let call = json!({
            "name": TOOL_NAME,
            "arguments": {"source": source, "query": query, "options": options, "caller": caller},
        });
        serde_json::from_value(call).map_err(|e| Error::Validation(format!("failed to encode tool call: {e}")))
    }

    fn decode(result: &CallToolResult) -> Result<Payload, Error> {
        let text = result.content.iter().find_map(|content| content.as_text()).map(|t| t.text.as_str());

        if result.is_error == Some(true) {
            return Err(Error::Handler(WireError::message(text.unwrap_or("search_source failed"))));
        }

        let text = text.ok_or_else(|| Error::Transport(format!("{TOOL_NAME} answered without text content")))?;
        let envelope: ResponseEnvelope =
            serde_json::from_str(text).map_err(|e| Error::Transport(format!("malformed response: {e}")))?;
        envelope.into_result()
    }

    fn service_error(&self, err: ServiceError) -> Error {
        match err {
            ServiceError::McpError(data) => Error::from(data),
            ServiceError::TransportClosed | ServiceError::TransportSend(_) => {
                self.connected.store(false, Ordering::SeqCst);
                tracing::warn!(error = %err, "lost connection to search server");
                Error::Transport(format!("connection lost: {err}"))
            }
            other => Error::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl Fetcher for McpFetcher {
    async fn fetch(&self, source: &str, query: Option<&str>, options: &SearchOptions) -> Result<Payload, Error> {
        let start = Instant::now();
        let request = Self::request(source, query, options, self.caller.as_deref())?;

        let result = self.peer.call_tool(request).await.map_err(|e| self.service_error(e))?;
        let payload = Self::decode(&result)?;

        tracing::debug!(source, rows = payload.len(), elapsed_ms = start.elapsed().as_millis() as u64, "fetched over mcp");

        Ok(payload)
    }

    fn is_available(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.session.lock().is_some()
    }

    fn name(&self) -> &'static str {
        "mcp"
    }
}

impl std::fmt::Debug for McpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpFetcher").field("connected", &self.is_available()).field("caller", &self.caller).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;

    #[test]
    fn test_config_default() {
        let config = McpFetcherConfig::default();
        assert_eq!(config.command, "searchsync-server");
        assert!(config.args.is_empty());
    }

    #[test]
    fn test_request_arguments() {
        let options = SearchOptions::default().with_skip(10).with_limit(5);
        let request = McpFetcher::request("books", Some("rust"), &options, Some("cli")).unwrap();

        assert_eq!(request.name, TOOL_NAME);
        let arguments = serde_json::Value::Object(request.arguments.unwrap_or_default());
        assert_eq!(
            arguments,
            json!({"source": "books", "query": "rust", "options": {"skip": 10, "limit": 5}, "caller": "cli"})
        );
    }

    #[test]
    fn test_decode_envelope_text() {
        let body = json!({"data": {"data": [{"_id": "a"}, {"_id": 2}], "metadata": {"total": 9}}}).to_string();
        let payload = McpFetcher::decode(&CallToolResult::success(vec![Content::text(body)])).unwrap();

        let (docs, meta) = payload.into_parts();
        assert_eq!(docs.iter().map(|d| d.key()).collect::<Vec<_>>(), vec!["a", "2"]);
        assert_eq!(meta.unwrap()["total"], json!(9));
    }

    #[test]
    fn test_decode_tool_error() {
        let result = CallToolResult::error(vec![Content::text("index offline")]);
        assert_eq!(McpFetcher::decode(&result), Err(Error::Handler(WireError::message("index offline"))));
    }

    #[test]
    fn test_decode_without_text() {
        let result = CallToolResult::success(Vec::new());
        assert!(matches!(McpFetcher::decode(&result), Err(Error::Transport(_))));
    }
}
