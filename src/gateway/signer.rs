//! AWS Signature Version 4 request signing for IAM-delegated profiles.

use crate::environment::{self, Env};
use crate::http::HttpRequest;
use crate::profile::AwsIam;
use ::http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use async_trait::async_trait;
use aws_config::meta::region::ProvideRegion;
use aws_config::profile::{ProfileFileCredentialsProvider, ProfileFileRegionProvider};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const AWS_PROFILE: &str = "AWS_PROFILE";
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";
pub const AWS_CONFIG_FILE: &str = "AWS_CONFIG_FILE";

const DEFAULT_AWS_PROFILE: &str = "default";
const ENVIRONMENT_PROVIDER: &str = "opensearch-cli-environment";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("aws region is not found. Either set 'AWS_REGION' or add this information during aws profile creation step")]
    MissingRegion,
    #[error("no aws credentials found for profile '{0}'")]
    MissingCredentials(String),
    #[error("cannot sign request for '{url}': {reason}")]
    InvalidRequest { url: String, reason: String },
}

/// Credentials and region that sign requests on behalf of one AWS profile
#[derive(Debug, Clone)]
pub struct AwsContext {
    pub credentials: Credentials,
    pub region: Option<String>,
}

/// Source of AWS credentials for an IAM-delegated profile
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn load(&self, aws: &AwsIam) -> Result<AwsContext, SigningError>;
}

/// Credentials of a named AWS profile from the shared files
/// (`~/.aws/credentials`, `~/.aws/config`), falling back to the `AWS_*` key
/// variables.
///
/// The region comes from `AWS_REGION`, then `AWS_DEFAULT_REGION`, then the
/// profile's `region` in the config file.
#[derive(Clone)]
pub struct AwsProfileCredentials {
    env: Arc<dyn Env>,
}

impl AwsProfileCredentials {
    pub fn new(env: Arc<dyn Env>) -> Self {
        Self { env }
    }

    fn shared_file(&self, variable: &str, file_name: &str) -> Option<PathBuf> {
        environment::non_empty(self.env.as_ref(), variable)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join(file_name)))
    }

    fn profile_files(&self) -> EnvConfigFiles {
        let mut files = EnvConfigFiles::builder();
        if let Some(path) = self.shared_file(AWS_SHARED_CREDENTIALS_FILE, "credentials") {
            files = files.with_file(EnvConfigFileKind::Credentials, path);
        }
        if let Some(path) = self.shared_file(AWS_CONFIG_FILE, "config") {
            files = files.with_file(EnvConfigFileKind::Config, path);
        }
        files.build()
    }

    /// A blank profile name means "whatever the environment selects".
    fn profile_name(&self, aws: &AwsIam) -> String {
        if !aws.profile_name.trim().is_empty() {
            return aws.profile_name.trim().to_string();
        }
        environment::non_empty(self.env.as_ref(), AWS_PROFILE)
            .unwrap_or_else(|| DEFAULT_AWS_PROFILE.to_string())
    }

    fn env_credentials(&self) -> Option<Credentials> {
        let env = self.env.as_ref();
        Some(Credentials::new(
            environment::non_empty(env, AWS_ACCESS_KEY_ID)?,
            environment::non_empty(env, AWS_SECRET_ACCESS_KEY)?,
            environment::non_empty(env, AWS_SESSION_TOKEN),
            None,
            ENVIRONMENT_PROVIDER,
        ))
    }

    fn env_region(&self) -> Option<String> {
        environment::non_empty(self.env.as_ref(), AWS_REGION)
            .or_else(|| environment::non_empty(self.env.as_ref(), AWS_DEFAULT_REGION))
    }
}

#[async_trait]
impl CredentialProvider for AwsProfileCredentials {
    async fn load(&self, aws: &AwsIam) -> Result<AwsContext, SigningError> {
        let profile = self.profile_name(aws);
        let files = self.profile_files();

        let from_files = ProfileFileCredentialsProvider::builder()
            .profile_files(files.clone())
            .profile_name(profile.clone())
            .build()
            .provide_credentials()
            .await;
        let credentials = match from_files {
            Ok(credentials) => credentials,
            Err(err) => {
                debug!(profile = %profile, error = %err, "no credentials in shared aws files");
                self.env_credentials()
                    .ok_or_else(|| SigningError::MissingCredentials(profile.clone()))?
            }
        };

        let region = match self.env_region() {
            Some(region) => Some(region),
            None => ProfileFileRegionProvider::builder()
                .profile_files(files)
                .profile_name(profile.clone())
                .build()
                .region()
                .await
                .map(|region| region.as_ref().to_string())
                .filter(|region| !region.is_empty()),
        };
        debug!(profile = %profile, region = ?region, "loaded aws credentials");
        Ok(AwsContext {
            credentials,
            region,
        })
    }
}

/// Signs `request` in place for `service` in the region of `context`.
///
/// Adds `X-Amz-Date`, `X-Amz-Security-Token` (temporary credentials) and
/// replaces any existing `Authorization` header.
pub fn sign_request(
    request: &mut HttpRequest,
    context: &AwsContext,
    service: &str,
    time: SystemTime,
) -> Result<(), SigningError> {
    let region = context
        .region
        .as_deref()
        .filter(|region| !region.is_empty())
        .ok_or(SigningError::MissingRegion)?;
    let target = request.url.clone();
    let invalid = |reason: String| SigningError::InvalidRequest {
        url: target.clone(),
        reason,
    };
    let url = Url::parse(&request.url).map_err(|e| invalid(e.to_string()))?;
    request.headers.remove(AUTHORIZATION);

    let signed_headers: Vec<(String, String)> = {
        let headers: Vec<(&str, &str)> = request
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)))
            .collect();
        let signable = SignableRequest::new(
            request.method.as_str(),
            url.as_str(),
            headers.into_iter(),
            SignableBody::Bytes(request.body_bytes()),
        )
        .map_err(|e| invalid(e.to_string()))?;

        let identity = &context.credentials.clone().into();
        let v4_params = v4::SigningParams::builder()
            .identity(identity)
            .region(region)
            .name(service)
            .time(time)
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        let params = aws_sigv4::http_request::SigningParams::from(v4_params);
        let (instructions, _signature) = aws_sigv4::http_request::sign(signable, &params)
            .map_err(|e| invalid(e.to_string()))?
            .into_parts();
        instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    };

    for (name, value) in signed_headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(&value).map_err(|e| invalid(e.to_string()))?;
        request.headers.insert(name, value);
    }
    debug!(service, region, "signed request");
    Ok(())
}
