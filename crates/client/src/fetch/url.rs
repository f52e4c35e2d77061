//! Endpoint URL resolution for the request/response transport.

use searchsync_core::wire::ENDPOINT_PATH;

/// Error type for endpoint resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a configured base URL into the full search endpoint URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to http:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment and query
/// 5. Append the endpoint path to whatever base path is present
pub fn endpoint_url(base: &str) -> Result<url::Url, UrlError> {
    let trimmed = base.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);
    parsed.set_query(None);

    let path = format!("{}{ENDPOINT_PATH}", parsed.path().trim_end_matches('/'));
    parsed.set_path(&path);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_basic() {
        let url = endpoint_url("http://localhost:3700").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3700/_search-source");
    }

    #[test]
    fn test_endpoint_default_scheme() {
        let url = endpoint_url("search.example.com").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("search.example.com"));
    }

    #[test]
    fn test_endpoint_lowercase_host() {
        let url = endpoint_url("https://EXAMPLE.COM").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = endpoint_url("https://example.com/api/").unwrap();
        assert_eq!(url.path(), "/api/_search-source");
    }

    #[test]
    fn test_endpoint_drops_query_and_fragment() {
        let url = endpoint_url("https://example.com/api?x=1#top").unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/api/_search-source");
    }

    #[test]
    fn test_endpoint_unsupported_scheme() {
        let result = endpoint_url("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_endpoint_empty() {
        assert!(matches!(endpoint_url(""), Err(UrlError::Empty)));
        assert!(matches!(endpoint_url("   "), Err(UrlError::Empty)));
    }
}
