//! # searchsync CLI
//!
//! Drives a [`SearchSource`] against a remote endpoint and prints the view.
//!
//! ## Usage
//!
//! - `searchsync books rust` - first page of "rust" from the `books` source
//! - `searchsync books rust --limit 10 --pages 3` - three pages merged through history
//! - `searchsync books --sort year:desc` - everything, newest first
//! - `searchsync books rust --transport stdio` - spawn `searchsync-server` and query it over MCP
//!
//! Configuration is read the same way as the server (`SEARCHSYNC_*`
//! environment variables, optional TOML file); flags override it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use searchsync_client::{
    HttpFetcher, HttpFetcherConfig, McpFetcher, McpFetcherConfig, SearchSource, SourceOptions, TransportSelector,
    ViewOptions,
};
use searchsync_core::{AppConfig, SearchOptions, SortField};
use tracing_subscriber::EnvFilter;

/// searchsync - query a remote search source through the client cache
#[derive(Parser)]
#[command(name = "searchsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query a remote search source and print the synchronized results")]
struct Cli {
    /// Source name registered on the server
    source: String,

    /// Query terms (omit to match everything)
    query: Vec<String>,

    /// Endpoint base URL override
    #[arg(long, env = "SEARCHSYNC_ENDPOINT")]
    endpoint: Option<String>,

    /// Transport to prefer; http is always the fallback
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,

    /// Server executable spawned for `--transport stdio`
    #[arg(long, default_value = "searchsync-server")]
    server_command: String,

    /// Argument passed to the spawned server (repeatable)
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    server_args: Vec<String>,

    /// Rows to skip
    #[arg(long)]
    skip: Option<usize>,

    /// Rows per page
    #[arg(long)]
    limit: Option<usize>,

    /// Number of successive pages to load (requires --limit)
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Sort key as `field` or `field:desc` (repeatable)
    #[arg(long = "sort", value_parser = parse_sort)]
    sort: Vec<SortField>,

    /// Field to filter on while a request is in flight (repeatable)
    #[arg(long = "field")]
    fields: Vec<String>,

    /// Keep history for this many milliseconds
    #[arg(long)]
    history_ms: Option<u64>,

    /// Caller identity sent to the server
    #[arg(long)]
    caller: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// POST to the request/response endpoint
    Http,
    /// Spawn the server and keep an MCP session on its stdio
    Stdio,
}

fn parse_sort(raw: &str) -> Result<SortField, String> {
    match raw.split_once(':') {
        None => Ok(SortField::asc(raw)),
        Some((field, "asc")) => Ok(SortField::asc(field)),
        Some((field, "desc")) => Ok(SortField::desc(field)),
        Some((_, order)) => Err(format!("unknown sort order {order:?}, expected asc or desc")),
    }
}

impl Cli {
    fn query(&self) -> Option<String> {
        let joined = self.query.join(" ");
        (!joined.trim().is_empty()).then_some(joined)
    }

    fn page(&self, index: usize) -> SearchOptions {
        let mut options = SearchOptions { sort: self.sort.clone(), ..Default::default() };
        options.skip = match (self.skip, self.limit) {
            (skip, Some(limit)) if index > 0 => Some(skip.unwrap_or(0) + index * limit),
            (skip, _) => skip,
        };
        options.limit = self.limit;
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { EnvFilter::new("searchsync_cli=debug,searchsync_client=debug") } else { EnvFilter::from_default_env() };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if cli.pages > 1 && cli.limit.is_none() {
        bail!("--pages needs --limit");
    }

    let mut config = AppConfig::load()?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(ms) = cli.history_ms {
        config.keep_history_ms = Some(ms);
    }

    let mut http_config = HttpFetcherConfig::from(&config);
    http_config.caller = cli.caller.clone();
    let http = HttpFetcher::new(http_config)?;
    tracing::debug!(url = %http.url(), "resolved endpoint");

    let mut options = SourceOptions::from(&config);
    if cli.pages > 1 && options.keep_history.is_none() {
        options = options.with_history(Duration::from_secs(60));
    }
    let fields = if cli.fields.is_empty() { config.corpus_fields.clone() } else { cli.fields.clone() };

    let mut selector = TransportSelector::new(Arc::new(http));
    if cli.transport == Transport::Stdio {
        let mcp = McpFetcher::spawn(McpFetcherConfig {
            command: cli.server_command.clone(),
            args: cli.server_args.clone(),
            caller: cli.caller.clone(),
        })
        .await?;
        selector = selector.with_connected(Arc::new(mcp));
    }
    let source = SearchSource::new(cli.source.clone(), fields, options, Arc::new(selector));

    let query = cli.query();
    for index in 0..cli.pages {
        source.search(query.as_deref(), cli.page(index)).finished().await?;
    }

    for doc in source.get_data(&ViewOptions { sort: cli.sort.clone(), ..Default::default() }) {
        println!("{}", serde_json::to_string(&doc)?);
    }

    let metadata = source.metadata();
    if !metadata.is_empty() {
        eprintln!("metadata: {}", serde_json::Value::Object(metadata));
    }
    let versions = source.versions();
    eprintln!(
        "status: {} ({} rows, version {}/{})",
        source.status(),
        source.mirror_len(),
        versions.loaded,
        versions.current
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchsync_core::SortOrder;

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("year").unwrap().order, SortOrder::Asc);
        let desc = parse_sort("meta.year:desc").unwrap();
        assert_eq!((desc.field.as_str(), desc.order), ("meta.year", SortOrder::Desc));
        assert!(parse_sort("year:sideways").is_err());
    }

    #[test]
    fn test_pages_advance_by_limit() {
        let cli = Cli::parse_from(["searchsync", "books", "rust", "--skip", "5", "--limit", "10", "--pages", "3"]);
        assert_eq!(cli.query().as_deref(), Some("rust"));
        assert_eq!(cli.page(0).window(), searchsync_core::Window::new(Some(5), Some(10)));
        assert_eq!(cli.page(2).window(), searchsync_core::Window::new(Some(25), Some(10)));
    }

    #[test]
    fn test_transport_flags() {
        let cli = Cli::parse_from(["searchsync", "books"]);
        assert_eq!(cli.transport, Transport::Http);
        assert_eq!(cli.server_command, "searchsync-server");

        let cli = Cli::parse_from([
            "searchsync",
            "books",
            "--transport",
            "stdio",
            "--server-command",
            "./target/debug/searchsync-server",
            "--server-arg",
            "--quiet",
        ]);
        assert_eq!(cli.transport, Transport::Stdio);
        assert_eq!(cli.server_command, "./target/debug/searchsync-server");
        assert_eq!(cli.server_args, vec!["--quiet"]);
    }

    #[test]
    fn test_empty_query_is_absent() {
        let cli = Cli::parse_from(["searchsync", "books"]);
        assert!(cli.query().is_none());
        assert_eq!(cli.page(0), SearchOptions::default());
    }
}
