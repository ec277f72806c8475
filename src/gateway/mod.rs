//! Profile-aware HTTP gateway: authentication, TLS, retry settings and
//! response classification on top of the retrying [`Client`].

pub mod platform;
pub mod signer;
pub mod tls;

#[cfg(test)]
pub(crate) mod test_support;

use crate::environment::{self, Env, ProcessEnv};
use crate::http::{Client, HttpBackend, HttpError, HttpRequest, RequestBuilder, RequestError};
use crate::profile::{InvalidEndpoint, Profile};
use ::http::header::{AUTHORIZATION, CONTENT_TYPE};
use ::http::Method;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use signer::{AwsProfileCredentials, CredentialProvider, SigningError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub use platform::PlatformGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    InvalidEndpoint(#[from] InvalidEndpoint),
    #[error("error loading client certificate '{cert}' and key '{key}': {reason}")]
    ClientIdentity {
        cert: String,
        key: String,
        reason: String,
    },
    #[error("error loading ca certificate '{path}': {reason}")]
    CaCertificate { path: String, reason: String },
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Transport(#[from] HttpError),
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Result of [`Gateway::call`]
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Response body of a `[200, 400)` answer
    Success(Vec<u8>),
    /// The caller's alternate status: no body, the classified error is kept
    Expected(RequestError),
}

/// Sends requests to the cluster a [`Profile`] points at.
///
/// Construction validates the endpoint, installs the profile's TLS material
/// and settles the effective retry ceiling and timeout: profile values win
/// over the client defaults and `OPENSEARCH_MAX_RETRY` / `OPENSEARCH_TIMEOUT`
/// win over both.
pub struct Gateway<B: HttpBackend + Send + Sync> {
    profile: Profile,
    endpoint: Url,
    client: Client<B>,
    credentials: Arc<dyn CredentialProvider>,
}

impl<B: HttpBackend + Send + Sync> Gateway<B> {
    pub fn new(profile: Profile, client: Client<B>) -> Result<Self, GatewayError> {
        Self::with_env(profile, client, Arc::new(ProcessEnv))
    }

    pub fn with_env(
        profile: Profile,
        mut client: Client<B>,
        env: Arc<dyn Env>,
    ) -> Result<Self, GatewayError> {
        let endpoint = profile.endpoint_url()?;

        let tls = match &profile.certificate {
            Some(trust) => tls::load_trust(trust)?,
            None => None,
        };

        let max_retry = environment::max_retry_override(env.as_ref())
            .or(profile.max_retry)
            .unwrap_or(client.max_retry());
        let timeout = environment::timeout_override(env.as_ref())
            .or(profile.timeout.map(Duration::from_secs))
            .unwrap_or(client.timeout());
        client.set_max_retry(max_retry);

        let has_tls = tls.is_some();
        if has_tls || timeout != client.timeout() {
            client
                .configure_transport(timeout, tls)
                .map_err(|err| transport_error(&profile, err))?;
        }
        info!(
            profile = %profile.name,
            endpoint = %endpoint,
            max_retry,
            timeout_secs = timeout.as_secs(),
            tls = has_tls,
            "gateway ready"
        );

        Ok(Self {
            profile,
            endpoint,
            client,
            credentials: Arc::new(AwsProfileCredentials::new(env)),
        })
    }

    /// Replaces the source of AWS credentials used for IAM-delegated profiles.
    pub fn with_credentials(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credentials = Arc::new(provider);
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn max_retry(&self) -> u32 {
        self.client.max_retry()
    }

    pub fn timeout(&self) -> Duration {
        self.client.timeout()
    }

    /// Builds a request with `payload` serialized as JSON.
    pub fn build_request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        payload: Option<&T>,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<HttpRequest, GatewayError> {
        let mut builder = self.request_builder(method, url, headers);
        if let Some(payload) = payload {
            builder = builder.json(payload)?;
        }
        Ok(builder.build()?)
    }

    /// Builds a request with a body that is sent verbatim.
    ///
    /// Caller headers override the defaults; basic auth is added whenever the
    /// profile has a user name.
    pub fn build_raw_request(
        &self,
        method: Method,
        payload: Option<Vec<u8>>,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<HttpRequest, GatewayError> {
        let mut builder = self.request_builder(method, url, headers);
        if let Some(body) = payload {
            builder = builder.body(body);
        }
        Ok(builder.build()?)
    }

    fn request_builder(
        &self,
        method: Method,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> RequestBuilder {
        let mut builder = HttpRequest::builder(url, method)
            .headers(default_headers())
            .headers(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if !self.profile.user_name.is_empty() {
            let credentials = format!("{}:{}", self.profile.user_name, self.profile.password);
            builder = builder.header(
                AUTHORIZATION.as_str(),
                format!("Basic {}", STANDARD.encode(credentials)),
            );
        }
        builder
    }

    /// Signs (for IAM-delegated profiles), sends and classifies a request,
    /// returning the body of a successful response.
    pub async fn execute(&self, mut request: HttpRequest) -> Result<Vec<u8>, GatewayError> {
        if let Some(aws) = &self.profile.aws_iam {
            let context = self.credentials.load(aws).await?;
            signer::sign_request(&mut request, &context, &aws.service_name, SystemTime::now())?;
        }
        let response = self.client.send(&request).await?;
        debug!(status = response.status, bytes = response.body.len(), "response received");
        Ok(RequestError::check(response.status, response.body, &request.url)?)
    }

    /// Like [`execute`](Self::execute), but a response with
    /// `alternate_status` is an expected outcome instead of an error.
    pub async fn call(
        &self,
        request: HttpRequest,
        alternate_status: u16,
    ) -> Result<CallOutcome, GatewayError> {
        match self.execute(request).await {
            Ok(body) => Ok(CallOutcome::Success(body)),
            Err(GatewayError::Request(err)) if err.status_code() == alternate_status => {
                Ok(CallOutcome::Expected(err))
            }
            Err(err) => Err(err),
        }
    }
}

/// Headers every request starts with
pub fn default_headers() -> HashMap<String, String> {
    HashMap::from([(CONTENT_TYPE.as_str().to_string(), "application/json".to_string())])
}

/// A transport that refuses the profile's client key pair is reported
/// against those files.
fn transport_error(profile: &Profile, err: HttpError) -> GatewayError {
    match &profile.certificate {
        Some(trust) if trust.client_certificate_path.is_some() => GatewayError::ClientIdentity {
            cert: trust.client_certificate_path.clone().unwrap_or_default(),
            key: trust.client_key_path.clone().unwrap_or_default(),
            reason: err.to_string(),
        },
        _ => GatewayError::Transport(err),
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{profile, reply, write_tls_material, MockBackend, StaticCredentials};
    use super::*;
    use crate::environment::StaticEnv;
    use crate::http::Backoff;
    use crate::profile::{AwsIam, Trust};
    use tokio_test::block_on;

    fn gateway(
        profile: Profile,
        backend: &Arc<MockBackend>,
        env: StaticEnv,
    ) -> Result<Gateway<Arc<MockBackend>>, GatewayError> {
        let client = Client::new(backend.clone()).with_backoff(Backoff::none());
        Gateway::with_env(profile, client, Arc::new(env))
    }

    #[test]
    fn test_new_uses_client_defaults() {
        let backend = MockBackend::replying(vec![]);
        let gw = gateway(profile("http://localhost:9200"), &backend, StaticEnv::new()).unwrap();
        assert_eq!(gw.max_retry(), crate::http::DEFAULT_MAX_RETRY);
        assert_eq!(gw.timeout(), crate::http::DEFAULT_TIMEOUT);
        assert_eq!(gw.endpoint().as_str(), "http://localhost:9200/");
        // default timeout and no TLS leave the transport alone
        assert!(backend.settings.lock().unwrap().is_none());
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let backend = MockBackend::replying(vec![]);
        let err = gateway(profile("localhost:9200"), &backend, StaticEnv::new())
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::InvalidEndpoint(_)));
        assert!(err.to_string().starts_with("invalid endpoint: localhost:9200 due to"));
    }

    #[test]
    fn test_profile_settings_then_environment_overrides() {
        let backend = MockBackend::replying(vec![]);
        let mut p = profile("http://localhost:9200");
        p.max_retry = Some(2);
        p.timeout = Some(30);

        let gw = gateway(p.clone(), &backend, StaticEnv::new()).unwrap();
        assert_eq!(gw.max_retry(), 2);
        assert_eq!(gw.timeout(), Duration::from_secs(30));
        let settings = backend.settings.lock().unwrap().clone().unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(30));

        let env = StaticEnv::new()
            .with(environment::OPENSEARCH_MAX_RETRY, "7")
            .with(environment::OPENSEARCH_TIMEOUT, "5");
        let gw = gateway(p, &backend, env).unwrap();
        assert_eq!(gw.max_retry(), 7);
        assert_eq!(gw.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_environment_overrides_are_ignored() {
        let backend = MockBackend::replying(vec![]);
        let mut p = profile("http://localhost:9200");
        p.max_retry = Some(1);
        let env = StaticEnv::new()
            .with(environment::OPENSEARCH_MAX_RETRY, "lots")
            .with(environment::OPENSEARCH_TIMEOUT, "-3");
        let gw = gateway(p, &backend, env).unwrap();
        assert_eq!(gw.max_retry(), 1);
        assert_eq!(gw.timeout(), crate::http::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_zero_timeout_disables_the_deadline() {
        let backend = MockBackend::replying(vec![reply(200, "{}")]);
        let env = StaticEnv::new().with(environment::OPENSEARCH_TIMEOUT, "0");
        let gw = gateway(profile("http://localhost:9200"), &backend, env).unwrap();
        assert_eq!(gw.timeout(), Duration::ZERO);
        let settings = backend.settings.lock().unwrap().clone().unwrap();
        assert!(settings.timeout.is_zero());

        let request = gw
            .build_raw_request(Method::GET, None, "http://localhost:9200/", &HashMap::new())
            .unwrap();
        assert_eq!(block_on(gw.execute(request)).unwrap(), b"{}".to_vec());
    }

    #[test]
    fn test_profile_trust_reaches_the_transport() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::replying(vec![]);
        let mut p = profile("https://localhost:9200");
        p.certificate = Some(write_tls_material(dir.path()));

        let gw = gateway(p, &backend, StaticEnv::new()).unwrap();
        let settings = backend.settings.lock().unwrap().clone().unwrap();
        assert_eq!(settings.timeout, gw.timeout());
        let tls = settings.tls.unwrap();
        assert!(tls.identity.is_some());
        assert_eq!(tls.root_certificates.len(), 1);
    }

    #[test]
    fn test_missing_ca_file_fails_construction() {
        let backend = MockBackend::replying(vec![]);
        let mut p = profile("https://localhost:9200");
        p.certificate = Some(Trust {
            ca_file_path: Some("/nonexistent/ca.pem".to_string()),
            ..Default::default()
        });
        let err = gateway(p, &backend, StaticEnv::new()).err().unwrap();
        assert!(matches!(err, GatewayError::CaCertificate { .. }));
    }

    #[test]
    fn test_build_request_sets_default_headers_and_json_body() {
        let backend = MockBackend::replying(vec![]);
        let gw = gateway(profile("http://localhost:9200"), &backend, StaticEnv::new()).unwrap();
        let payload = serde_json::json!({"name": "idx"});
        let req = gw
            .build_request(
                Method::PUT,
                Some(&payload),
                "http://localhost:9200/idx",
                &HashMap::new(),
            )
            .unwrap();
        assert_eq!(req.headers.get("content-type").unwrap(), "application/json");
        assert!(req.headers.get("authorization").is_none());
        let sent: serde_json::Value = serde_json::from_slice(req.body_bytes()).unwrap();
        assert_eq!(sent, payload);
    }

    #[test]
    fn test_build_raw_request_adds_basic_auth_and_caller_headers_win() {
        let backend = MockBackend::replying(vec![]);
        let mut p = profile("http://localhost:9200");
        p.user_name = "admin".to_string();
        p.password = "admin".to_string();
        let gw = gateway(p, &backend, StaticEnv::new()).unwrap();

        let headers = HashMap::from([("content-type".to_string(), "application/x-ndjson".to_string())]);
        let req = gw
            .build_raw_request(
                Method::POST,
                Some(b"{}\n".to_vec()),
                "http://localhost:9200/_bulk",
                &headers,
            )
            .unwrap();
        assert_eq!(req.headers.get("content-type").unwrap(), "application/x-ndjson");
        assert_eq!(req.headers.get("authorization").unwrap(), "Basic YWRtaW46YWRtaW4=");
        assert_eq!(req.body_bytes(), b"{}\n");
    }

    #[test]
    fn test_execute_returns_body_on_success() {
        let backend = MockBackend::replying(vec![reply(200, r#"{"acknowledged":true}"#)]);
        let gw = gateway(profile("http://localhost:9200"), &backend, StaticEnv::new()).unwrap();
        let req = gw
            .build_raw_request(Method::GET, None, "http://localhost:9200/", &HashMap::new())
            .unwrap();
        let body = block_on(gw.execute(req)).unwrap();
        assert_eq!(body, br#"{"acknowledged":true}"#);
    }

    #[test]
    fn test_execute_classifies_error_responses() {
        let backend = MockBackend::replying(vec![reply(404, r#"{"found":false}"#)]);
        let gw = gateway(profile("http://localhost:9200"), &backend, StaticEnv::new()).unwrap();
        let req = gw
            .build_raw_request(Method::GET, None, "http://localhost:9200/idx", &HashMap::new())
            .unwrap();
        let err = block_on(gw.execute(req)).unwrap_err();
        match err {
            GatewayError::Request(err) => {
                assert_eq!(err.status_code(), 404);
                assert_eq!(
                    err.to_string(),
                    "404 Client Error: Not Found for url: http://localhost:9200/idx"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_execute_retries_with_effective_ceiling() {
        let backend = MockBackend::replying(vec![
            reply(503, ""),
            reply(503, ""),
            reply(503, "still down"),
        ]);
        let env = StaticEnv::new().with(environment::OPENSEARCH_MAX_RETRY, "2");
        let gw = gateway(profile("http://localhost:9200"), &backend, env).unwrap();
        let req = gw
            .build_raw_request(Method::GET, None, "http://localhost:9200/", &HashMap::new())
            .unwrap();
        let err = block_on(gw.execute(req)).unwrap_err();
        assert!(matches!(err, GatewayError::Request(ref e) if e.status_code() == 503));
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn test_call_turns_alternate_status_into_expected_outcome() {
        let backend = MockBackend::replying(vec![
            reply(404, r#"{"found":false}"#),
            reply(400, "bad"),
            reply(200, "ok"),
        ]);
        let gw = gateway(profile("http://localhost:9200"), &backend, StaticEnv::new()).unwrap();
        let req = || {
            gw.build_raw_request(Method::GET, None, "http://localhost:9200/idx", &HashMap::new())
                .unwrap()
        };

        match block_on(gw.call(req(), 404)).unwrap() {
            CallOutcome::Expected(err) => assert_eq!(err.status_code(), 404),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(
            block_on(gw.call(req(), 404)).unwrap_err(),
            GatewayError::Request(_)
        ));
        assert_eq!(
            block_on(gw.call(req(), 404)).unwrap(),
            CallOutcome::Success(b"ok".to_vec())
        );
    }

    #[test]
    fn test_execute_signs_aws_requests() {
        let backend = MockBackend::replying(vec![reply(200, "{}")]);
        let mut p = profile("https://search.us-east-1.es.amazonaws.com");
        p.aws_iam = Some(AwsIam {
            profile_name: "prod".to_string(),
            service_name: "es".to_string(),
        });
        let gw = gateway(p, &backend, StaticEnv::new())
            .unwrap()
            .with_credentials(StaticCredentials(Some("us-east-1".to_string())));
        let req = gw
            .build_raw_request(
                Method::GET,
                None,
                "https://search.us-east-1.es.amazonaws.com/_cat/indices",
                &HashMap::new(),
            )
            .unwrap();
        block_on(gw.execute(req)).unwrap();

        let sent = backend.last_request();
        let authorization = sent.headers.get("authorization").unwrap().to_str().unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(authorization.contains("/us-east-1/es/aws4_request"));
        assert!(sent.headers.contains_key("x-amz-date"));
    }

    #[test]
    fn test_missing_region_fails_without_sending() {
        let backend = MockBackend::replying(vec![reply(200, "{}")]);
        let mut p = profile("https://search.es.amazonaws.com");
        p.aws_iam = Some(AwsIam {
            profile_name: "prod".to_string(),
            service_name: "es".to_string(),
        });
        let gw = gateway(p, &backend, StaticEnv::new())
            .unwrap()
            .with_credentials(StaticCredentials(None));
        let req = gw
            .build_raw_request(Method::GET, None, "https://search.es.amazonaws.com/", &HashMap::new())
            .unwrap();
        let err = block_on(gw.execute(req)).unwrap_err();
        assert!(matches!(err, GatewayError::Signing(SigningError::MissingRegion)));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_network_failures_surface_as_transport_errors() {
        let backend = MockBackend::replying(vec![
            Err(HttpError::Network("connection refused".to_string())),
            Err(HttpError::Network("connection refused".to_string())),
        ]);
        let env = StaticEnv::new().with(environment::OPENSEARCH_MAX_RETRY, "1");
        let gw = gateway(profile("http://localhost:9200"), &backend, env).unwrap();
        let req = gw
            .build_raw_request(Method::GET, None, "http://localhost:9200/", &HashMap::new())
            .unwrap();
        let err = block_on(gw.execute(req)).unwrap_err();
        assert!(matches!(err, GatewayError::Transport(HttpError::Network(_))));
        assert_eq!(backend.calls(), 2);
    }
}
