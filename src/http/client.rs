use crate::http::{
    backend::{HttpBackend, TlsSettings, TransportSettings, DEFAULT_TIMEOUT},
    error::HttpError,
    request::HttpRequest,
    response::HttpResponse,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry attempts used when neither the profile nor the environment sets one
pub const DEFAULT_MAX_RETRY: u32 = 4;

/// Exponential backoff between retry attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// No waiting between attempts
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (zero based). A server supplied
    /// `Retry-After` wins over the computed value.
    pub fn delay(&self, retry: u32, response: Option<&HttpResponse>) -> Duration {
        if let Some(requested) = response.and_then(HttpResponse::retry_after) {
            return requested;
        }
        let factor = 2u32.saturating_pow(retry.min(16));
        self.min.saturating_mul(factor).min(self.max)
    }
}

/// Retrying HTTP client generic over backend
///
/// Connection failures and transient responses (429, 5xx other than 501) are
/// retried up to `max_retry` times. When the retries of a transient response
/// run out, that last response is returned so the caller can classify it;
/// when network failures run out, the client gives up with
/// [`HttpError::Network`].
///
/// # Examples
///
/// ```
/// use opensearch_cli::http::{Client, ReqwestBackend, HttpRequest};
/// use http::Method;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new(ReqwestBackend::new()?);
/// let request = HttpRequest::builder("https://localhost:9200/_cluster/health", Method::GET)
///     .build()?;
///
/// let response = client.send(&request).await?;
/// println!("Status: {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client<B: HttpBackend + Send + Sync> {
    pub backend: B,
    max_retry: u32,
    timeout: Duration,
    backoff: Backoff,
}

impl<B: HttpBackend + Send + Sync> Client<B> {
    /// Constructs a new Client with the built-in retry and timeout defaults
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_retry: DEFAULT_MAX_RETRY,
            timeout: DEFAULT_TIMEOUT,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    pub fn set_max_retry(&mut self, max_retry: u32) {
        self.max_retry = max_retry;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Rebuilds the backend transport with a new timeout and optional TLS material
    pub fn configure_transport(
        &mut self,
        timeout: Duration,
        tls: Option<TlsSettings>,
    ) -> Result<(), HttpError> {
        self.backend.configure(TransportSettings { timeout, tls })?;
        self.timeout = timeout;
        Ok(())
    }

    /// Sends an HTTP request, retrying transient failures
    pub async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let attempts = self.max_retry.saturating_add(1);
        let mut retry = 0;
        loop {
            debug!(method = %req.method, url = %req.url, attempt = retry + 1, "sending request");
            match self.backend.send(req).await {
                Ok(response) if response.is_transient() && retry < self.max_retry => {
                    let delay = self.backoff.delay(retry, Some(&response));
                    warn!(
                        status = response.status,
                        url = %req.url,
                        delay_ms = delay.as_millis() as u64,
                        "transient response, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => {
                    debug!(status = response.status, url = %req.url, "received response");
                    return Ok(response);
                }
                Err(err) if err.is_transient() && retry < self.max_retry => {
                    let delay = self.backoff.delay(retry, None);
                    warn!(error = %err, url = %req.url, delay_ms = delay.as_millis() as u64, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    return Err(HttpError::Network(format!(
                        "{} {} giving up after {} attempt(s): {}",
                        req.method, req.url, attempts, err
                    )));
                }
                Err(err) => return Err(err),
            }
            retry += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::{reply, MockBackend};
    use ::http::{HeaderMap, Method};
    use tokio_test::block_on;

    fn get() -> HttpRequest {
        HttpRequest::new("http://localhost:9200", Method::GET, None, HeaderMap::new())
    }

    #[test]
    fn test_defaults() {
        let client = Client::new(MockBackend::replying(vec![]));
        assert_eq!(client.max_retry(), DEFAULT_MAX_RETRY);
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_client_returns_first_success() {
        let backend = MockBackend::replying(vec![reply(200, "ok")]);
        let client = Client::new(backend.clone()).with_backoff(Backoff::none());

        let resp = block_on(client.send(&get())).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"ok");
        assert_eq!(backend.calls(), 1);
        assert_eq!(backend.last_request().url, "http://localhost:9200");
    }

    #[test]
    fn test_client_retries_transient_response() {
        let backend = MockBackend::replying(vec![reply(503, ""), reply(200, "ok")]);
        let client = Client::new(backend.clone()).with_backoff(Backoff::none());

        let resp = block_on(client.send(&get())).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn test_client_does_not_retry_client_errors_or_501() {
        for status in [404, 501] {
            let backend = MockBackend::replying(vec![reply(status, ""), reply(200, "")]);
            let client = Client::new(backend.clone()).with_backoff(Backoff::none());

            let resp = block_on(client.send(&get())).unwrap();
            assert_eq!(resp.status, status);
            assert_eq!(backend.calls(), 1);
        }
    }

    #[test]
    fn test_client_returns_last_transient_response_when_retries_run_out() {
        let backend = MockBackend::replying(vec![
            reply(500, "1"),
            reply(500, "2"),
            reply(500, "3"),
        ]);
        let mut client = Client::new(backend.clone()).with_backoff(Backoff::none());
        client.set_max_retry(2);

        let resp = block_on(client.send(&get())).unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, b"3");
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn test_client_gives_up_after_network_failures() {
        let backend = MockBackend::replying(vec![
            Err(HttpError::Network("connection refused".to_string())),
            Err(HttpError::Network("connection refused".to_string())),
        ]);
        let mut client = Client::new(backend.clone()).with_backoff(Backoff::none());
        client.set_max_retry(1);

        let err = block_on(client.send(&get())).unwrap_err();
        assert!(matches!(err, HttpError::Network(_)));
        assert!(err.to_string().contains("giving up after 2 attempt(s)"));
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn test_client_does_not_retry_non_transient_errors() {
        let backend = MockBackend::replying(vec![Err(HttpError::Parse("bad url".to_string()))]);
        let client = Client::new(backend.clone()).with_backoff(Backoff::none());

        let err = block_on(client.send(&get())).unwrap_err();
        assert!(matches!(err, HttpError::Parse(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_zero_retries_sends_once() {
        let backend = MockBackend::replying(vec![reply(503, ""), reply(200, "")]);
        let mut client = Client::new(backend.clone()).with_backoff(Backoff::none());
        client.set_max_retry(0);

        let resp = block_on(client.send(&get())).unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_configure_transport_updates_timeout_and_backend() {
        let backend = MockBackend::replying(vec![]);
        let mut client = Client::new(backend.clone());

        client
            .configure_transport(Duration::from_secs(60), None)
            .unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(60));
        let settings = backend.settings.lock().unwrap().clone().unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0, None), Duration::from_secs(1));
        assert_eq!(backoff.delay(1, None), Duration::from_secs(2));
        assert_eq!(backoff.delay(3, None), Duration::from_secs(8));
        assert_eq!(backoff.delay(10, None), Duration::from_secs(30));
    }
}
