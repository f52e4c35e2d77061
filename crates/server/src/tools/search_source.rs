//! search_source tool implementation.
//!
//! The persistent-connection counterpart of `POST /_search-source`: the same
//! registry call, with errors reported as JSON-RPC errors instead of an
//! error envelope.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use searchsync_core::{ResponseEnvelope, SearchOptions};
use serde::{Deserialize, Serialize};

use crate::registry::{InvocationContext, SourceRegistry, Transport};

/// Input parameters for search_source tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchSourceParams {
    /// Registered source name.
    pub source: String,

    /// Free-text query; omit to match everything.
    #[serde(default)]
    pub query: Option<String>,

    /// Row window, sort and source-specific parameters.
    #[serde(default)]
    pub options: SearchOptions,

    /// Caller identity passed to the handler.
    #[serde(default)]
    pub caller: Option<String>,
}

/// Implementation of the search_source tool.
///
/// On success the text content is a `{"data": ...}` response envelope.
pub fn search_impl(registry: &SourceRegistry, params: SearchSourceParams) -> Result<CallToolResult, McpError> {
    let ctx = InvocationContext::new(Transport::Stdio, params.caller);
    let payload = registry.invoke(&params.source, params.query.as_deref(), &params.options, &ctx)?;

    let body = serde_json::to_string(&ResponseEnvelope::ok(payload))
        .map_err(|e| McpError::internal_error(format!("failed to encode response: {e}"), None))?;

    Ok(CallToolResult::success(vec![Content::text(body)]))
}
