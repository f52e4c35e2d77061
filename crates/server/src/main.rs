//! searchsync server entry point.
//!
//! Boots the source registry and serves it over HTTP (`POST /_search-source`)
//! or over MCP on stdio, as configured. Logging goes to stderr so the stdio
//! transport keeps stdout for JSON-RPC.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use searchsync_core::{AppConfig, ServerTransport};
use tracing_subscriber::EnvFilter;

mod corpus;
mod error;
mod handler;
mod http;
mod registry;
mod tools;

use corpus::CorpusSource;
use registry::SourceRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let registry = Arc::new(build_registry(&config)?);

    match config.transport {
        ServerTransport::Http => {
            let addr: SocketAddr = config.bind_addr.parse().context("invalid bind_addr")?;
            http::serve(addr, registry).await?;
        }
        ServerTransport::Stdio => {
            tracing::info!(sources = ?registry.names(), "Starting searchsync server on stdio transport");
            let server = serve_server(handler::SearchSyncServer::new(registry), stdio()).await?;
            server.waiting().await?;
        }
    }

    Ok(())
}

fn build_registry(config: &AppConfig) -> Result<SourceRegistry> {
    let path = config.require_corpus_path()?;
    let corpus = CorpusSource::load(path, config.corpus_fields.clone())?;

    let mut registry = SourceRegistry::new();
    registry.register(config.corpus_source.clone(), corpus);
    Ok(registry)
}
