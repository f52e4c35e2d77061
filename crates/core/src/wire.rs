//! Wire envelopes for the plain request/response transport.
//!
//! ### Request
//! `POST /_search-source` with content type [`CONTENT_TYPE`] and a body of
//! `{"source": ..., "query": ..., "options": {...}}`.
//!
//! ### Response
//! `{"error": {...}}` on failure, `{"data": ...}` on success, where `data` is
//! either a bare document array or `{"data": [...], "metadata": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Document, Error, SearchOptions, WireError};

/// Path of the fallback endpoint.
pub const ENDPOINT_PATH: &str = "/_search-source";

/// Content type of request and response bodies.
pub const CONTENT_TYPE: &str = "application/x-search-source+json";

/// Header carrying the caller identity on the fallback transport.
pub const CALLER_HEADER: &str = "x-search-caller";

/// Request body for the fallback transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub source: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub options: SearchOptions,
}

/// Response body for the fallback transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
}

impl ResponseEnvelope {
    pub fn ok(data: Payload) -> Self {
        Self { error: None, data: Some(data) }
    }

    pub fn err(error: &Error) -> Self {
        Self { error: Some(error.to_wire()), data: None }
    }

    /// Collapse the envelope into a result.
    ///
    /// An envelope with neither field is an empty result.
    pub fn into_result(self) -> Result<Payload, Error> {
        match (self.error, self.data) {
            (Some(error), _) => Err(Error::from_wire(error)),
            (None, Some(data)) => Ok(data),
            (None, None) => Ok(Payload::Documents(Vec::new())),
        }
    }
}

impl From<Result<Payload, Error>> for ResponseEnvelope {
    fn from(result: Result<Payload, Error>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}

/// Data returned by a source: a bare sequence, or one wrapped with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Documents(Vec<Document>),
    Envelope {
        data: Vec<Document>,
        #[serde(default)]
        metadata: Option<Map<String, Value>>,
    },
}

impl Payload {
    pub fn with_metadata(data: Vec<Document>, metadata: Map<String, Value>) -> Self {
        Payload::Envelope { data, metadata: Some(metadata) }
    }

    /// Split into documents and metadata.
    ///
    /// Metadata is `Some` whenever the envelope form was used, defaulting to
    /// an empty map when the envelope carried none.
    pub fn into_parts(self) -> (Vec<Document>, Option<Map<String, Value>>) {
        match self {
            Payload::Documents(data) => (data, None),
            Payload::Envelope { data, metadata } => (data, Some(metadata.unwrap_or_default())),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Documents(data) | Payload::Envelope { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Document>> for Payload {
    fn from(data: Vec<Document>) -> Self {
        Payload::Documents(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_bare_sequence() {
        let payload: Payload = serde_json::from_value(json!([{"_id": "a"}, {"_id": "b"}])).unwrap();
        let (docs, metadata) = payload.into_parts();
        assert_eq!(docs.len(), 2);
        assert!(metadata.is_none());
    }

    #[test]
    fn test_payload_envelope() {
        let payload: Payload =
            serde_json::from_value(json!({"data": [{"_id": "a"}], "metadata": {"total": 42}})).unwrap();
        let (docs, metadata) = payload.into_parts();
        assert_eq!(docs.len(), 1);
        assert_eq!(metadata.unwrap().get("total"), Some(&json!(42)));
    }

    #[test]
    fn test_payload_envelope_without_metadata() {
        let payload: Payload = serde_json::from_value(json!({"data": []})).unwrap();
        let (_, metadata) = payload.into_parts();
        assert_eq!(metadata, Some(Map::new()));
    }

    #[test]
    fn test_request_envelope_defaults() {
        let req: RequestEnvelope = serde_json::from_value(json!({"source": "people"})).unwrap();
        assert_eq!(req.source, "people");
        assert!(req.query.is_none());
        assert_eq!(req.options, SearchOptions::default());
    }

    #[test]
    fn test_response_envelope_error() {
        let envelope = ResponseEnvelope::err(&Error::SourceNotFound("people".into()));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], "SOURCE_NOT_FOUND");
        assert!(json.get("data").is_none());

        let err = envelope.into_result().unwrap_err();
        assert_eq!(err, Error::SourceNotFound("people".into()));
    }

    #[test]
    fn test_response_envelope_data() {
        let envelope: ResponseEnvelope = serde_json::from_value(json!({"data": [{"_id": 1}]})).unwrap();
        let payload = envelope.into_result().unwrap();
        assert_eq!(payload.len(), 1);
    }
}
