//! Search request options and validation.

use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Document, Error};

/// Options sent alongside a query to a search source.
///
/// `skip` and `limit` describe the requested row window. Everything else
/// shapes the result set itself and therefore participates in the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchOptions {
    /// Rows to skip from the start of the authoritative result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,

    /// Maximum rows to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Server-side sort specification.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortField>,

    /// Source-specific parameters passed through verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

/// One sort key: a (possibly dotted) field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: SortOrder::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: SortOrder::Desc }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Requested row window `[skip, skip + limit)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl Window {
    pub fn new(skip: Option<usize>, limit: Option<usize>) -> Self {
        Self { skip, limit }
    }

    /// Whether a sub-range was requested at all.
    pub fn is_bounded(&self) -> bool {
        self.skip.is_some() || self.limit.is_some()
    }

    /// Effective start row (skip defaults to 0).
    pub fn start(&self) -> usize {
        self.skip.unwrap_or(0)
    }

    /// Exclusive end row, if a limit was given.
    pub fn end(&self) -> Option<usize> {
        self.limit.map(|limit| self.start().saturating_add(limit))
    }
}

impl SearchOptions {
    pub fn with_window(mut self, window: Window) -> Self {
        self.skip = window.skip;
        self.limit = window.limit;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn window(&self) -> Window {
        Window::new(self.skip, self.limit)
    }

    /// Copy of these options with the row window removed.
    pub fn without_window(&self) -> Self {
        Self { skip: None, limit: None, ..self.clone() }
    }

    /// Validate option shapes before anything is dispatched.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if:
    /// - `limit` is 0
    /// - `skip + limit` overflows
    /// - a sort entry has an empty field path
    pub fn validate(&self) -> Result<(), Error> {
        if self.limit == Some(0) {
            return Err(Error::Validation("limit must be greater than 0".into()));
        }

        if let (Some(skip), Some(limit)) = (self.skip, self.limit)
            && skip.checked_add(limit).is_none()
        {
            return Err(Error::Validation(format!("window overflows: skip {skip} + limit {limit}")));
        }

        if let Some(bad) = self.sort.iter().find(|s| s.field.trim().is_empty() || s.field.split('.').any(str::is_empty)) {
            return Err(Error::Validation(format!("invalid sort field path: {:?}", bad.field)));
        }

        Ok(())
    }
}

/// Compare two documents by a sort specification.
///
/// Missing values sort before present ones; mixed types order as
/// null < bool < number < string < array < object.
pub fn compare_documents(a: &Document, b: &Document, sort: &[SortField]) -> Ordering {
    for key in sort {
        let ord = compare_values(a.get_path(&key.field), b.get_path(&key.field));
        let ord = match key.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                x.as_f64().unwrap_or(0.0).partial_cmp(&y.as_f64().unwrap_or(0.0)).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
