//! Document selectors, sorting and the mirror's read options.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use searchsync_core::{Document, SortField};
use serde_json::Value;

pub use searchsync_core::request::compare_documents;

/// Filter over mirror documents.
#[derive(Debug, Clone, Default)]
pub enum Selector {
    /// Every document.
    #[default]
    All,
    /// The value at `path` is a string matching `regex`, or an array holding one.
    Matches { path: String, regex: Regex },
    /// The value at `path` equals `value`.
    Equals { path: String, value: Value },
    /// Any of the inner selectors. An empty list matches nothing.
    Or(Vec<Selector>),
    /// All of the inner selectors. An empty list matches everything.
    And(Vec<Selector>),
}

impl Selector {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Selector::All => true,
            Selector::Matches { path, regex } => doc.get_path(path).is_some_and(|v| value_matches(v, regex)),
            Selector::Equals { path, value } => doc.get_path(path) == Some(value),
            Selector::Or(inner) => inner.iter().any(|s| s.matches(doc)),
            Selector::And(inner) => inner.iter().all(|s| s.matches(doc)),
        }
    }

    /// Regex match on any of `fields`.
    pub fn any_field_matches(fields: &[String], regex: &Regex) -> Self {
        Selector::Or(fields.iter().map(|f| Selector::Matches { path: f.clone(), regex: regex.clone() }).collect())
    }
}

fn value_matches(value: &Value, regex: &Regex) -> bool {
    match value {
        Value::String(s) => regex.is_match(s),
        Value::Array(items) => items.iter().any(|item| matches!(item, Value::String(s) if regex.is_match(s))),
        _ => false,
    }
}

/// Per-document transform applied to each emitted row.
pub type DocTransform = Arc<dyn Fn(Document) -> Document + Send + Sync>;

/// Sort, limit and transform for a mirror read.
#[derive(Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<SortField>,
    pub limit: Option<usize>,
    pub transform: Option<DocTransform>,
}

impl fmt::Debug for FindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FindOptions")
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
