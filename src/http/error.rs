use ::http::StatusCode;
use thiserror::Error;

/// Transport-level failures
///
/// Represents everything that can go wrong before a complete HTTP response is
/// available: connectivity problems, unreadable bodies, unusable TLS material.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// Network-related errors (connection failed, timeout, retries exhausted)
    #[error("Network error: {0}")]
    Network(String),
    /// HTTP parsing errors (malformed response, unreadable body, etc.)
    #[error("Parse error: {0}")]
    Parse(String),
    /// Unsupported HTTP method
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
    /// The transport could not be configured with the supplied settings
    #[error("Transport error: {0}")]
    Transport(String),
}

impl HttpError {
    /// Whether the failure is worth another attempt.
    ///
    /// Connection failures and timeouts are retried; malformed requests, bad
    /// methods and transport misconfiguration never succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Network(_))
    }
}

/// Application-level failure: the server answered with a 4xx or 5xx status
///
/// Carries the status code and the raw response body so callers can either
/// branch on the status or show the server's own explanation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RequestError {
    status: u16,
    body: Vec<u8>,
    message: String,
}

impl RequestError {
    /// Hands the body back for `[200, 400)` (and informational codes), or
    /// turns the response into a `RequestError`.
    pub fn check(status: u16, body: Vec<u8>, url: &str) -> Result<Vec<u8>, Self> {
        let kind = match status {
            400..=499 => "Client Error",
            s if s >= 500 => "Server Error",
            _ => return Ok(body),
        };
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("");
        Err(Self {
            status,
            body,
            message: format!("{status} {kind}: {reason} for url: {url}"),
        })
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Response body pretty-printed as JSON, or the raw body when it is not a
    /// JSON object.
    pub fn response(&self) -> String {
        match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&self.body) {
            Ok(data) => serde_json::to_string_pretty(&data)
                .unwrap_or_else(|_| String::from_utf8_lossy(&self.body).into_owned()),
            Err(_) => String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    /// First `error.root_cause[].reason` in a cluster error body, if any.
    pub fn root_cause_reason(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        value
            .get("error")?
            .get("root_cause")?
            .get(0)?
            .get("reason")?
            .as_str()
            .map(str::to_string)
    }
}
