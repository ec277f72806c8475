use super::signer::{AwsContext, CredentialProvider, SigningError};
use crate::http::{HttpBackend, HttpError, HttpRequest, HttpResponse, TransportSettings};
use crate::profile::{AwsIam, Profile, Trust};
use ::http::HeaderMap;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Records every request and answers from a queue of canned replies.
#[derive(Default)]
pub struct MockBackend {
    pub requests: Mutex<Vec<HttpRequest>>,
    pub replies: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    pub settings: Mutex<Option<TransportSettings>>,
}

impl MockBackend {
    pub fn replying(replies: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpBackend for Arc<MockBackend> {
    async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(req.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Network("no reply queued".to_string())))
    }

    fn configure(&mut self, settings: TransportSettings) -> Result<(), HttpError> {
        *self.settings.lock().unwrap() = Some(settings);
        Ok(())
    }
}

pub fn reply(status: u16, body: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    })
}

pub fn profile(endpoint: &str) -> Profile {
    Profile {
        name: "test".to_string(),
        endpoint: endpoint.to_string(),
        ..Default::default()
    }
}

/// Fixed credentials and region
pub struct StaticCredentials(pub Option<String>);

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn load(&self, _aws: &AwsIam) -> Result<AwsContext, SigningError> {
        Ok(AwsContext {
            credentials: Credentials::new("AKIDEXAMPLE", "secret", None, None, "test"),
            region: self.0.clone(),
        })
    }
}

/// Writes a self-signed certificate, used both as CA bundle and as client
/// identity, and returns a trust section naming the three files.
pub fn write_tls_material(dir: &Path) -> Trust {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
        .unwrap()
        .self_signed(&key_pair)
        .unwrap();
    let ca = dir.join("ca.pem");
    let client_cert = dir.join("client.pem");
    let client_key = dir.join("client.key");
    fs::write(&ca, cert.pem()).unwrap();
    fs::write(&client_cert, cert.pem()).unwrap();
    fs::write(&client_key, key_pair.serialize_pem()).unwrap();
    Trust {
        ca_file_path: Some(ca.to_string_lossy().into_owned()),
        client_certificate_path: Some(client_cert.to_string_lossy().into_owned()),
        client_key_path: Some(client_key.to_string_lossy().into_owned()),
    }
}
