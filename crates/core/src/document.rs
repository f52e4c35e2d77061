//! Documents and their identifiers.
//!
//! Sources may hand back primitive ids (strings, integers) or structured
//! object ids. All of them are normalized into [`DocId`], whose canonical
//! string projection is what every set and map operation keys on.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document identifier as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    Text(String),
    /// Any JSON number, integer or not. Its canonical form is the number as
    /// serde_json prints it.
    Number(serde_json::Number),
    /// Structured object id, `{"$oid": "..."}` (`{"_str": "..."}` is also accepted).
    Object {
        #[serde(rename = "$oid", alias = "_str")]
        oid: String,
    },
}

impl DocId {
    /// Canonical string projection used for identity comparisons.
    pub fn canonical(&self) -> String {
        match self {
            DocId::Text(s) => s.clone(),
            DocId::Number(n) => n.to_string(),
            DocId::Object { oid } => oid.clone(),
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId::Text(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        DocId::Text(s)
    }
}

impl From<i64> for DocId {
    fn from(n: i64) -> Self {
        DocId::Number(n.into())
    }
}

/// A search result document: an id plus arbitrary JSON fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<DocId>) -> Self {
        Self { id: id.into(), fields: Map::new() }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Canonical id projection, shorthand for `self.id.canonical()`.
    pub fn key(&self) -> String {
        self.id.canonical()
    }

    /// Look up a possibly dotted field path (`"author.name"`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Replace the value at a dotted field path.
    ///
    /// Returns `false` when an intermediate segment is missing or not a
    /// container; the document is left untouched in that case.
    pub fn set_path(&mut self, path: &str, value: Value) -> bool {
        let (parent_path, leaf) = match path.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, path),
        };

        let Some(parent_path) = parent_path else {
            self.fields.insert(leaf.to_string(), value);
            return true;
        };

        let mut parts = parent_path.split('.');
        let Some(first) = parts.next() else { return false };
        let Some(mut current) = self.fields.get_mut(first) else { return false };
        for part in parts {
            current = match current {
                Value::Object(map) => match map.get_mut(part) {
                    Some(next) => next,
                    None => return false,
                },
                Value::Array(items) => match part.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    Some(next) => next,
                    None => return false,
                },
                _ => return false,
            };
        }

        match current {
            Value::Object(map) => {
                map.insert(leaf.to_string(), value);
                true
            }
            Value::Array(items) => match leaf.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}
