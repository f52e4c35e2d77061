//! Plain request/response endpoint.
//!
//! `POST /_search-source` always answers 200 with a [`ResponseEnvelope`];
//! failures travel inside the envelope, not as HTTP status codes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use searchsync_core::wire::{CALLER_HEADER, CONTENT_TYPE, ENDPOINT_PATH};
use searchsync_core::{Error, RequestEnvelope, ResponseEnvelope};

use crate::registry::{InvocationContext, SourceRegistry, Transport};

pub fn router(registry: Arc<SourceRegistry>) -> Router {
    Router::new().route(ENDPOINT_PATH, post(search_source)).with_state(registry)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: SocketAddr, registry: Arc<SourceRegistry>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, path = ENDPOINT_PATH, "serving search sources over http");
    axum::serve(listener, router(registry)).await
}

async fn search_source(State(registry): State<Arc<SourceRegistry>>, headers: HeaderMap, body: Bytes) -> Response {
    let caller = headers.get(CALLER_HEADER).and_then(|v| v.to_str().ok()).map(String::from);
    let envelope = respond(&registry, caller, &body);

    match serde_json::to_vec(&envelope) {
        Ok(bytes) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], bytes).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response envelope");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Decode a request body, run it and wrap the outcome.
pub fn respond(registry: &SourceRegistry, caller: Option<String>, body: &[u8]) -> ResponseEnvelope {
    let request: RequestEnvelope = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return ResponseEnvelope::err(&Error::Validation(format!("malformed request: {e}"))),
    };

    let ctx = InvocationContext::new(Transport::Http, caller);
    registry.invoke(&request.source, request.query.as_deref(), &request.options, &ctx).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use axum::http::HeaderValue;
    use searchsync_core::{Document, Payload, SearchOptions, WireError};
    use serde_json::json;

    fn registry() -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.register("people", |query: Option<&str>, options: &SearchOptions, ctx: &InvocationContext| {
            let doc = Document::new(query.unwrap_or("all"))
                .with("limit", options.limit.unwrap_or(0))
                .with("caller", ctx.caller.clone().unwrap_or_default());
            Ok::<_, HandlerError>(Payload::Documents(vec![doc]))
        });
        registry
    }

    #[test]
    fn test_respond_success() {
        let body = json!({"source": "people", "query": "alice", "options": {"limit": 5}}).to_string();
        let envelope = respond(&registry(), Some("web".into()), body.as_bytes());

        let (docs, _) = envelope.into_result().unwrap().into_parts();
        assert_eq!(docs[0].key(), "alice");
        assert_eq!(docs[0].get_path("limit"), Some(&json!(5)));
        assert_eq!(docs[0].get_path("caller"), Some(&json!("web")));
    }

    #[test]
    fn test_respond_unknown_source() {
        let body = json!({"source": "nobody"}).to_string();
        let envelope = respond(&registry(), None, body.as_bytes());
        assert_eq!(envelope.error.and_then(|e| e.code).as_deref(), Some("SOURCE_NOT_FOUND"));
    }

    #[test]
    fn test_respond_malformed_body() {
        let envelope = respond(&registry(), None, b"{not json");
        let error = envelope.error.unwrap();
        assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"));
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_endpoint_answers_with_envelope() {
        let mut headers = HeaderMap::new();
        headers.insert(CALLER_HEADER, HeaderValue::from_static("cli"));
        let body = Bytes::from(json!({"source": "people", "query": "bob"}).to_string());

        let response = search_source(State(Arc::new(registry())), headers, body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], CONTENT_TYPE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let envelope: ResponseEnvelope = serde_json::from_slice(&bytes).unwrap();
        let (docs, _) = envelope.into_result().unwrap().into_parts();
        assert_eq!(docs[0].get_path("caller"), Some(&json!("cli")));
    }

    #[tokio::test]
    async fn test_endpoint_reports_handler_errors_in_body() {
        let mut registry = SourceRegistry::new();
        registry.register("broken", |_: Option<&str>, _: &SearchOptions, _: &InvocationContext| {
            Err::<Payload, _>(HandlerError::coded("DOWN", "index offline"))
        });
        let body = Bytes::from(json!({"source": "broken"}).to_string());

        let response = search_source(State(Arc::new(registry)), HeaderMap::new(), body).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let envelope: ResponseEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope.error, Some(WireError::coded("DOWN", "index offline")));
    }
}
