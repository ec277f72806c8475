use crate::http::error::HttpError;
use ::http::{HeaderMap, HeaderName, HeaderValue, Method};

/// Builder for constructing HTTP requests with a fluent API
///
/// Header names and values that are not valid HTTP tokens are reported when
/// the request is built rather than silently dropped, so a mistyped `-H`
/// argument never turns into a request without the intended header.
///
/// # Examples
///
/// ```
/// use opensearch_cli::http::HttpRequest;
/// use http::Method;
///
/// let request = HttpRequest::builder("https://localhost:9200/_cat/indices", Method::GET)
///     .header("accept", "application/json")
///     .build()?;
/// assert_eq!(request.headers.get("accept").unwrap(), "application/json");
/// # Ok::<(), opensearch_cli::http::HttpError>(())
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header to the request
    ///
    /// Later values for the same name replace earlier ones.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Add multiple headers in iteration order
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the raw request body
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `data` as the JSON request body
    pub fn json<T: serde::Serialize + ?Sized>(mut self, data: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(data)
            .map_err(|e| HttpError::Parse(format!("Failed to serialize JSON: {e}")))?;
        self.body = Some(body);
        Ok(self)
    }

    /// Build the final HttpRequest
    pub fn build(self) -> Result<HttpRequest, HttpError> {
        let mut headers = HeaderMap::new();
        for (key, value) in self.headers {
            let name = key
                .parse::<HeaderName>()
                .map_err(|_| HttpError::Parse(format!("invalid header name '{key}'")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|_| HttpError::Parse(format!("invalid value for header '{key}'")))?;
            headers.insert(name, value);
        }
        Ok(HttpRequest {
            url: self.url,
            method: self.method,
            body: self.body,
            headers,
        })
    }
}

/// Represents an HTTP request with URL, method, body, and headers
///
/// The body is kept as raw bytes: payloads read from `@file` arguments may be
/// compressed or otherwise binary and are sent verbatim.
#[derive(Debug, PartialEq, Clone)]
pub struct HttpRequest {
    /// Target URL for the request
    pub url: String,
    /// HTTP method to use
    pub method: Method,
    /// Optional request body
    pub body: Option<Vec<u8>>,
    /// HTTP headers to send
    pub headers: HeaderMap,
}

impl HttpRequest {
    pub fn new(url: &str, method: Method, body: Option<Vec<u8>>, headers: HeaderMap) -> Self {
        Self {
            url: url.to_string(),
            method,
            body,
            headers,
        }
    }

    /// Create a request builder for complex requests
    pub fn builder(url: impl Into<String>, method: Method) -> RequestBuilder {
        RequestBuilder::new(url, method)
    }

    /// Body bytes, empty when the request carries no payload.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}
