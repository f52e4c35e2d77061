//! Stable cache key generation.

use std::fmt;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::SearchOptions;

/// History cache key for a `(query, options)` pair.
///
/// The row window (`skip`/`limit`) is excluded so successive pages of one
/// query land in one entry. Structurally equal options produce identical
/// keys no matter how their maps were built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(query: Option<&str>, options: &SearchOptions) -> Self {
        let shape = serde_json::to_value(options.without_window()).unwrap_or(Value::Null);
        let material = json!({ "query": query, "options": shape });

        let mut canonical = String::new();
        write_canonical(&material, &mut canonical);

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize a JSON value with object keys sorted at every level.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
