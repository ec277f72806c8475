use crate::http::error::HttpError;
use ::http::Method;

/// Methods the cluster REST API is driven with
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::PATCH,
];

/// Parse a string into one of the [`SUPPORTED_METHODS`], ignoring case and
/// surrounding whitespace
///
/// # Examples
///
/// ```
/// use opensearch_cli::http::parse_method;
/// use http::Method;
///
/// assert_eq!(parse_method("GET").unwrap(), Method::GET);
/// assert_eq!(parse_method(" post ").unwrap(), Method::POST);
/// assert!(parse_method("HEAD").is_err());
/// ```
pub fn parse_method(s: &str) -> Result<Method, HttpError> {
    let upper = s.trim().to_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|method| method.as_str() == upper)
        .cloned()
        .ok_or_else(|| HttpError::UnsupportedMethod(s.to_string()))
}
