//! MCP server handler implementation.
//!
//! Serves the registry over the persistent stdio transport. Every registered
//! source is reachable through the single `search_source` tool.
use std::sync::Arc;

use crate::registry::SourceRegistry;
use crate::tools::search_source::{SearchSourceParams, search_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for searchsync.
#[derive(Clone)]
pub struct SearchSyncServer {
    registry: Arc<SourceRegistry>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SearchSyncServer {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry, tool_router: Self::tool_router() }
    }

    /// Query a registered search source.
    #[tool(
        description = "Query a named search source. Returns a JSON envelope {\"data\": ...} holding the matching documents and optional metadata."
    )]
    async fn search_source(&self, params: Parameters<SearchSourceParams>) -> Result<CallToolResult, McpError> {
        search_impl(&self.registry, params.0)
    }
}

impl ServerHandler for SearchSyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "searchsync".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!("Registered sources: {}", self.registry.names().join(", "))),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusSource;
    use crate::error::HandlerError;
    use crate::registry::InvocationContext;
    use rmcp::service::serve_server;
    use searchsync_client::{Fetcher, McpFetcher, SearchSource, SourceOptions};
    use searchsync_core::{Document, Error, Payload, SearchOptions, WireError};
    use std::time::Duration;

    fn books() -> SourceRegistry {
        let docs = (0..30).map(|i| Document::new(format!("b{i}")).with("title", format!("Rust volume {i}"))).collect();
        let mut registry = SourceRegistry::new();
        registry.register("books", CorpusSource::new(docs, vec!["title".into()]));
        registry.register("broken", |_: Option<&str>, _: &SearchOptions, _: &InvocationContext| {
            Err::<Payload, _>(HandlerError::coded("DOWN", "index offline"))
        });
        registry
    }

    async fn connected(registry: SourceRegistry) -> Arc<McpFetcher> {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let server = SearchSyncServer::new(Arc::new(registry));
        tokio::spawn(async move {
            if let Ok(running) = serve_server(server, server_io).await {
                let _ = running.waiting().await;
            }
        });
        Arc::new(McpFetcher::connect(client_io, Some("tests".into())).await.unwrap())
    }

    #[test]
    fn test_lists_search_source_tool() {
        let server = SearchSyncServer::new(Arc::new(SourceRegistry::new()));
        let names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["search_source"]);
    }

    #[test]
    fn test_info_names_sources() {
        let mut registry = SourceRegistry::new();
        registry.register("books", crate::corpus::CorpusSource::new(Vec::new(), Vec::new()));
        let info = SearchSyncServer::new(Arc::new(registry)).get_info();
        assert_eq!(info.server_info.name, "searchsync");
        assert_eq!(info.instructions.as_deref(), Some("Registered sources: books"));
    }

    #[tokio::test]
    async fn test_source_pages_over_mcp_session() {
        let fetcher = connected(books()).await;
        assert!(fetcher.is_available());

        let options = SourceOptions::default().with_history(Duration::from_secs(60));
        let source = SearchSource::new("books", vec!["title".into()], options, fetcher.clone());
        source.search(Some("rust"), SearchOptions::default().with_limit(10)).finished().await.unwrap();
        source.search(Some("rust"), SearchOptions::default().with_skip(10).with_limit(10)).finished().await.unwrap();

        assert_eq!(source.mirror_len(), 20);
        assert_eq!(source.metadata().get("total"), Some(&serde_json::json!(30)));
        assert!(source.status().is_loaded());
    }

    #[tokio::test]
    async fn test_errors_cross_the_session_intact() {
        let fetcher = connected(books()).await;

        let err = fetcher.fetch("films", None, &SearchOptions::default()).await.unwrap_err();
        assert_eq!(err, Error::SourceNotFound("films".into()));

        let err = fetcher.fetch("broken", None, &SearchOptions::default()).await.unwrap_err();
        assert_eq!(err, Error::Handler(WireError::coded("DOWN", "index offline")));

        let err = fetcher.fetch("books", None, &SearchOptions::default().with_limit(0)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(fetcher.is_available());
    }

    #[tokio::test]
    async fn test_closed_session_is_unavailable() {
        let fetcher = connected(books()).await;
        fetcher.close().await;
        assert!(!fetcher.is_available());
    }
}
