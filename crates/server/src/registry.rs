//! Named search source registry.
//!
//! The hosting process builds one [`SourceRegistry`], registers its sources
//! and hands it to every endpoint. Nothing here is global.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use searchsync_core::{Error, Payload, SearchOptions};

use crate::error::HandlerError;

/// Endpoint a call arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Stdio,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => f.write_str("http"),
            Transport::Stdio => f.write_str("stdio"),
        }
    }
}

/// Who is calling, and how.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub caller: Option<String>,
    pub transport: Transport,
    pub received_at: DateTime<Utc>,
}

impl InvocationContext {
    pub fn new(transport: Transport, caller: Option<String>) -> Self {
        Self { caller, transport, received_at: Utc::now() }
    }
}

/// A named search backend.
pub trait SourceHandler: Send + Sync {
    fn search(&self, query: Option<&str>, options: &SearchOptions, ctx: &InvocationContext)
    -> Result<Payload, HandlerError>;
}

impl<F> SourceHandler for F
where
    F: Fn(Option<&str>, &SearchOptions, &InvocationContext) -> Result<Payload, HandlerError> + Send + Sync,
{
    fn search(
        &self, query: Option<&str>, options: &SearchOptions, ctx: &InvocationContext,
    ) -> Result<Payload, HandlerError> {
        self(query, options, ctx)
    }
}

/// Source name to handler map.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn SourceHandler>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, handler: impl SourceHandler + 'static) -> &mut Self {
        let name = name.into();
        if self.sources.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::warn!(source = %name, "replaced registered search source");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the handler registered as `name`.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` for malformed options (the handler is not called)
    /// - `Error::SourceNotFound` for an unregistered name
    /// - `Error::Handler` for anything the handler raises
    pub fn invoke(
        &self, name: &str, query: Option<&str>, options: &SearchOptions, ctx: &InvocationContext,
    ) -> Result<Payload, Error> {
        options.validate()?;

        let handler = self.sources.get(name).ok_or_else(|| Error::SourceNotFound(name.to_string()))?;

        let payload = handler.search(query, options, ctx).map_err(|e| {
            tracing::warn!(source = name, transport = %ctx.transport, error = %e, "search handler failed");
            Error::from(e)
        })?;

        tracing::debug!(
            source = name,
            transport = %ctx.transport,
            caller = ctx.caller.as_deref().unwrap_or("-"),
            rows = payload.len(),
            "served search"
        );

        Ok(payload)
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry").field("sources", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchsync_core::{Document, WireError};

    fn echo(query: Option<&str>, _: &SearchOptions, ctx: &InvocationContext) -> Result<Payload, HandlerError> {
        let doc = Document::new(query.unwrap_or("none")).with("caller", ctx.caller.clone().unwrap_or_default());
        Ok(Payload::Documents(vec![doc]))
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new(Transport::Http, Some("tester".into()))
    }

    #[test]
    fn test_invoke_passes_query_and_context() {
        let mut registry = SourceRegistry::new();
        registry.register("echo", echo);

        let (docs, _) = registry.invoke("echo", Some("hi"), &SearchOptions::default(), &ctx()).unwrap().into_parts();
        assert_eq!(docs[0].key(), "hi");
        assert_eq!(docs[0].get_path("caller"), Some(&serde_json::json!("tester")));
    }

    #[test]
    fn test_unknown_source() {
        let registry = SourceRegistry::new();
        let err = registry.invoke("nope", None, &SearchOptions::default(), &ctx()).unwrap_err();
        assert_eq!(err, Error::SourceNotFound("nope".into()));
    }

    #[test]
    fn test_handler_error_is_structured() {
        let mut registry = SourceRegistry::new();
        registry.register("fails", |_: Option<&str>, _: &SearchOptions, _: &InvocationContext| {
            Err::<Payload, _>(HandlerError::coded("UPSTREAM", "index offline"))
        });

        let err = registry.invoke("fails", None, &SearchOptions::default(), &ctx()).unwrap_err();
        assert_eq!(err, Error::Handler(WireError::coded("UPSTREAM", "index offline")));
    }

    #[test]
    fn test_invalid_options_skip_handler() {
        let mut registry = SourceRegistry::new();
        registry.register("echo", echo);

        let err = registry.invoke("echo", None, &SearchOptions::default().with_limit(0), &ctx()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = SourceRegistry::new();
        registry.register("b", echo).register("a", echo);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.contains("a"));
    }
}
