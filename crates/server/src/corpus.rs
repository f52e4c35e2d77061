//! Built-in source serving documents from a JSON file.
//!
//! The file holds an array of documents. A document matches when any
//! configured field contains any query term, ignoring case. No query matches
//! everything. Results honour sort, then skip and limit, and carry the total
//! match count as `metadata.total`.

use std::path::Path;

use searchsync_core::request::compare_documents;
use searchsync_core::{Document, Payload, SearchOptions};
use serde_json::{Map, Value};

use crate::error::{HandlerError, ServerError};
use crate::registry::{InvocationContext, SourceHandler};

#[derive(Debug, Clone)]
pub struct CorpusSource {
    documents: Vec<Document>,
    fields: Vec<String>,
}

impl CorpusSource {
    pub fn new(documents: Vec<Document>, fields: Vec<String>) -> Self {
        Self { documents, fields }
    }

    /// Read a corpus file.
    pub fn load(path: &Path, fields: Vec<String>) -> Result<Self, ServerError> {
        let raw = std::fs::read(path).map_err(|source| ServerError::CorpusRead { path: path.to_path_buf(), source })?;
        let documents: Vec<Document> =
            serde_json::from_slice(&raw).map_err(|source| ServerError::CorpusParse { path: path.to_path_buf(), source })?;

        tracing::info!(path = %path.display(), documents = documents.len(), fields = ?fields, "loaded corpus");

        Ok(Self::new(documents, fields))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matches(&self, doc: &Document, terms: &[String]) -> bool {
        terms.is_empty()
            || self
                .fields
                .iter()
                .filter_map(|field| doc.get_path(field))
                .any(|value| value_contains(value, terms))
    }
}

fn value_contains(value: &Value, terms: &[String]) -> bool {
    match value {
        Value::String(s) => {
            let s = s.to_lowercase();
            terms.iter().any(|t| s.contains(t.as_str()))
        }
        Value::Array(items) => items.iter().any(|item| value_contains(item, terms)),
        _ => false,
    }
}

impl SourceHandler for CorpusSource {
    fn search(
        &self, query: Option<&str>, options: &SearchOptions, _ctx: &InvocationContext,
    ) -> Result<Payload, HandlerError> {
        let terms: Vec<String> = query.unwrap_or_default().split_whitespace().map(str::to_lowercase).collect();

        let mut matched: Vec<&Document> = self.documents.iter().filter(|doc| self.matches(doc, &terms)).collect();
        if !options.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }

        let total = matched.len();
        let window = options.window();
        let page: Vec<Document> = matched
            .into_iter()
            .skip(window.start())
            .take(window.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        let mut metadata = Map::new();
        metadata.insert("total".into(), Value::from(total));

        Ok(Payload::with_metadata(page, metadata))
    }
}
