//! Query result view over the mirror.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use searchsync_core::{Document, SortField};
use serde_json::Value;
use tokio::sync::watch;

use super::SearchSource;
use crate::mirror::{DocTransform, FindOptions, Selector};
use crate::pattern::build_regex;

/// Per-field transform: `(value, regex, field, query) -> new value`.
pub type FieldTransform = Arc<dyn Fn(&Value, &Regex, &str, &str) -> Value + Send + Sync>;

/// Read options for [`SearchSource::get_data`].
#[derive(Clone, Default)]
pub struct ViewOptions {
    pub sort: Vec<SortField>,
    pub limit: Option<usize>,
    /// Applied to every search field holding a non-empty, non-zero, non-false
    /// value, while a query is set.
    pub transform: Option<FieldTransform>,
    /// Applied last, after field transforms.
    pub doc_transform: Option<DocTransform>,
}

impl ViewOptions {
    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_transform(mut self, transform: impl Fn(&Value, &Regex, &str, &str) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn with_doc_transform(mut self, transform: impl Fn(Document) -> Document + Send + Sync + 'static) -> Self {
        self.doc_transform = Some(Arc::new(transform));
        self
    }
}

impl fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewOptions")
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("transform", &self.transform.is_some())
            .field("doc_transform", &self.doc_transform.is_some())
            .finish()
    }
}

impl SearchSource {
    /// Current view of the mirror.
    ///
    /// While a request is in flight the mirror may still hold the previous
    /// query's rows, so documents are filtered client-side: a document
    /// qualifies when any search field matches the query regex. Once the
    /// request settles the mirror is returned as-is.
    pub fn get_data(&self, options: &ViewOptions) -> Vec<Document> {
        let state = self.shared.state.lock();
        let query = state.current_query.clone().filter(|q| !q.trim().is_empty());
        let regex = build_regex(query.as_deref());

        let filtering = state.status.is_loading() && query.is_some() && !self.shared.search_fields.is_empty();
        let selector = if filtering { Selector::any_field_matches(&self.shared.search_fields, &regex) } else { Selector::All };

        let find = FindOptions { sort: options.sort.clone(), limit: options.limit, transform: None };
        let documents = state.mirror.find(&selector, &find);
        drop(state);

        documents
            .into_iter()
            .map(|doc| match (&options.transform, &query) {
                (Some(transform), Some(query)) => self.transform_fields(doc, transform, &regex, query),
                _ => doc,
            })
            .map(|doc| match &options.doc_transform {
                Some(transform) => transform(doc),
                None => doc,
            })
            .collect()
    }

    fn transform_fields(&self, mut doc: Document, transform: &FieldTransform, regex: &Regex, query: &str) -> Document {
        for field in &self.shared.search_fields {
            let Some(value) = doc.get_path(field).filter(|v| is_present(v)) else {
                continue;
            };
            let replaced = transform(value, regex, field, query);
            doc.set_path(field, replaced);
        }
        doc
    }

    /// Reactive handle that re-reads the view whenever the mirror or status changes.
    pub fn live(&self, options: ViewOptions) -> LiveView {
        LiveView {
            source: self.clone(),
            options,
            store: self.shared.store_changed.watch(),
            status: self.shared.status_changed.watch(),
        }
    }
}

/// Whether a field value is worth transforming: null, `false`, zero and the
/// empty string are skipped.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Live query handle returned by [`SearchSource::live`].
pub struct LiveView {
    source: SearchSource,
    options: ViewOptions,
    store: watch::Receiver<u64>,
    status: watch::Receiver<u64>,
}

impl LiveView {
    /// Read the view and mark every pending change as seen.
    pub fn fetch(&mut self) -> Vec<Document> {
        self.store.mark_unchanged();
        self.status.mark_unchanged();
        self.source.get_data(&self.options)
    }

    /// Wait until the mirror or the status changes since the last [`fetch`](Self::fetch).
    pub async fn changed(&mut self) {
        // Both senders live as long as `self.source`, so neither branch can error out.
        tokio::select! {
            _ = self.store.changed() => {}
            _ = self.status.changed() => {}
        }
    }

    pub fn source(&self) -> &SearchSource {
        &self.source
    }
}

impl fmt::Debug for LiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveView").field("source", &self.source.name()).field("options", &self.options).finish()
    }
}
