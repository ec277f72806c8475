use ::http::HeaderMap;
use std::time::Duration;

/// Represents an HTTP response with status, headers, and body
///
/// # Examples
///
/// ```
/// use opensearch_cli::http::HttpResponse;
/// use http::HeaderMap;
///
/// let response = HttpResponse {
///     status: 200,
///     headers: HeaderMap::new(),
///     body: br#"{"status": "green"}"#.to_vec(),
/// };
///
/// assert!(!response.is_transient());
/// assert_eq!(response.retry_after(), None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether a retry has a chance of producing a different answer.
    ///
    /// Throttling and server-side failures are retried, except 501 which
    /// states the server will never support the request.
    pub fn is_transient(&self) -> bool {
        self.status == 429 || (self.status >= 500 && self.status != 501)
    }

    /// Delay requested through a `Retry-After` header expressed in seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        if self.status != 429 && self.status != 503 {
            return None;
        }
        self.headers
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}
