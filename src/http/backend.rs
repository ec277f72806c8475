use crate::http::{error::HttpError, request::HttpRequest, response::HttpResponse};
use async_trait::async_trait;
use reqwest::{Certificate, Identity};
use std::error::Error as _;
use std::time::Duration;

/// Default per-request timeout of a freshly created transport
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS material to install into a transport
///
/// Root certificates extend the platform trust store, they never replace it.
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub root_certificates: Vec<Certificate>,
    pub identity: Option<Identity>,
}

impl TlsSettings {
    pub fn is_empty(&self) -> bool {
        self.root_certificates.is_empty() && self.identity.is_none()
    }
}

/// Everything a backend needs to (re)build its underlying connection machinery
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Per-request timeout, zero disables it
    pub timeout: Duration,
    pub tls: Option<TlsSettings>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            tls: None,
        }
    }
}

/// Trait for HTTP backends that handle the actual network communication
///
/// This trait keeps the gateway backend-agnostic: production code talks to
/// [`ReqwestBackend`], tests plug in a mock that records requests and replays
/// canned responses.
///
/// # Examples
///
/// ```
/// use opensearch_cli::http::{HttpBackend, HttpRequest, HttpResponse, HttpError};
/// use async_trait::async_trait;
///
/// struct LoggingBackend<B: HttpBackend> {
///     inner: B,
/// }
///
/// #[async_trait]
/// impl<B: HttpBackend + Send + Sync> HttpBackend for LoggingBackend<B> {
///     async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
///         println!("Sending request to: {}", req.url);
///         let response = self.inner.send(req).await?;
///         println!("Received response with status: {}", response.status);
///         Ok(response)
///     }
/// }
/// ```
#[async_trait]
pub trait HttpBackend {
    /// Send an HTTP request and return the response
    ///
    /// Any status code is a successful send; classification happens above
    /// this layer.
    async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError>;

    /// Apply timeout and TLS settings to the transport
    ///
    /// Backends without a real transport may ignore the settings.
    fn configure(&mut self, _settings: TransportSettings) -> Result<(), HttpError> {
        Ok(())
    }
}

/// Default backend using reqwest for real HTTP requests
///
/// Holds one `reqwest::Client`, so connections are reused across the
/// requests of a single command.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Backend with default settings
    pub fn new() -> Result<Self, HttpError> {
        Self::with_settings(TransportSettings::default())
    }

    /// Backend built from explicit transport settings
    pub fn with_settings(settings: TransportSettings) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("opensearch-cli/", env!("CARGO_PKG_VERSION")));
        if !settings.timeout.is_zero() {
            builder = builder.timeout(settings.timeout);
        }
        if let Some(tls) = settings.tls {
            for certificate in tls.root_certificates {
                builder = builder.add_root_certificate(certificate);
            }
            if let Some(identity) = tls.identity {
                builder = builder.identity(identity);
            }
        }
        let client = builder
            .build()
            .map_err(|e| HttpError::Transport(describe(&e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut request_builder = self
            .client
            .request(req.method.clone(), &req.url)
            .headers(req.headers.clone());
        if let Some(ref body) = req.body {
            request_builder = request_builder.body(body.clone());
        }
        let resp = request_builder.send().await.map_err(|e| {
            if e.is_builder() {
                HttpError::Parse(describe(&e))
            } else {
                HttpError::Network(describe(&e))
            }
        })?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| HttpError::Network(describe(&e)))?
            .to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn configure(&mut self, settings: TransportSettings) -> Result<(), HttpError> {
        *self = Self::with_settings(settings)?;
        Ok(())
    }
}

/// reqwest errors keep the interesting part (refused, dns, certificate) in
/// their source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_settings_empty() {
        assert!(TlsSettings::default().is_empty());
    }

    #[test]
    fn test_default_transport_settings() {
        let settings = TransportSettings::default();
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
        assert!(settings.tls.is_none());
    }

    #[test]
    fn test_reqwest_backend_builds_with_defaults() {
        assert!(ReqwestBackend::new().is_ok());
    }

    #[test]
    fn test_reqwest_backend_builds_without_timeout() {
        let settings = TransportSettings {
            timeout: Duration::ZERO,
            tls: None,
        };
        assert!(ReqwestBackend::with_settings(settings).is_ok());
    }
}
