//! Named connection profiles and the rules for picking one per command.

use crate::config::{ConfigError, ConfigStore};
use crate::environment::{self, Env, ProcessEnv};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Profile used when neither `--profile` nor `OPENSEARCH_PROFILE` names one
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Name given to a profile assembled purely from environment variables
pub const ENVIRONMENT_PROFILE_NAME: &str = "environment";

/// AWS IAM delegation: requests are SigV4 signed with credentials of the named
/// AWS profile for the given service (e.g. `es`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsIam {
    #[serde(rename = "profile")]
    pub profile_name: String,
    #[serde(rename = "service")]
    pub service_name: String,
}

/// File paths of TLS trust material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trust {
    #[serde(rename = "cafilepath", default, skip_serializing_if = "Option::is_none")]
    pub ca_file_path: Option<String>,
    #[serde(
        rename = "clientcertificatefilepath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate_path: Option<String>,
    #[serde(rename = "clientkeyfilepath", default, skip_serializing_if = "Option::is_none")]
    pub client_key_path: Option<String>,
}

/// Connection and authentication settings for one cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub endpoint: String,
    #[serde(rename = "user", default, skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_iam: Option<AwsIam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Trust>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid endpoint: {endpoint} due to {reason}")]
pub struct InvalidEndpoint {
    pub endpoint: String,
    pub reason: String,
}

/// Parses a profile endpoint, requiring a scheme and a host.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, InvalidEndpoint> {
    let invalid = |reason: String| InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

impl Profile {
    pub fn endpoint_url(&self) -> Result<Url, InvalidEndpoint> {
        parse_endpoint(&self.endpoint)
    }

    /// Applies `OPENSEARCH_ENDPOINT`, `OPENSEARCH_USER` and
    /// `OPENSEARCH_PASSWORD` on top of the stored settings.
    pub fn with_env_overrides(mut self, env: &dyn Env) -> Self {
        if let Some(endpoint) = environment::non_empty(env, environment::OPENSEARCH_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(user) = environment::non_empty(env, environment::OPENSEARCH_USER) {
            self.user_name = user;
        }
        if let Some(password) = env.var(environment::OPENSEARCH_PASSWORD) {
            if !password.is_empty() {
                self.password = password;
            }
        }
        self
    }

    /// A profile assembled from environment variables alone, available when
    /// `OPENSEARCH_ENDPOINT` is set.
    pub fn from_env(env: &dyn Env) -> Option<Self> {
        environment::non_empty(env, environment::OPENSEARCH_ENDPOINT)?;
        let profile = Profile {
            name: ENVIRONMENT_PROFILE_NAME.to_string(),
            ..Default::default()
        };
        Some(profile.with_env_overrides(env))
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile '{0}' does not exist")]
    NotFound(String),
    #[error("profile {0} already exists")]
    AlreadyExists(String),
    #[error("profile name cannot be empty")]
    EmptyName,
    #[error("no profiles found")]
    NoneConfigured,
    #[error("no profiles found for: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error(transparent)]
    InvalidEndpoint(#[from] InvalidEndpoint),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Profile operations over a [`ConfigStore`]
pub struct ProfileController<S: ConfigStore> {
    store: S,
    env: Box<dyn Env>,
}

impl<S: ConfigStore> ProfileController<S> {
    pub fn new(store: S) -> Self {
        Self::with_env(store, ProcessEnv)
    }

    pub fn with_env(store: S, env: impl Env + 'static) -> Self {
        Self {
            store,
            env: Box::new(env),
        }
    }

    pub fn list(&self) -> Result<Vec<Profile>, ProfileError> {
        Ok(self.store.read()?.profiles)
    }

    pub fn names(&self) -> Result<Vec<String>, ProfileError> {
        Ok(self.list()?.into_iter().map(|p| p.name).collect())
    }

    pub fn profiles_map(&self) -> Result<HashMap<String, Profile>, ProfileError> {
        Ok(self
            .list()?
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect())
    }

    /// Appends a new profile and writes the whole config back.
    pub fn create(&self, profile: Profile) -> Result<(), ProfileError> {
        if profile.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }
        profile.endpoint_url()?;
        let mut config = self.store.read()?;
        if config.profiles.iter().any(|p| p.name == profile.name) {
            return Err(ProfileError::AlreadyExists(profile.name));
        }
        info!(profile = %profile.name, "creating profile");
        config.profiles.push(profile);
        self.store.write(&config)?;
        Ok(())
    }

    /// Removes every named profile that exists and persists the result, then
    /// reports the names that were not found.
    pub fn delete(&self, names: &[String]) -> Result<(), ProfileError> {
        let mut config = self.store.read()?;
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !config.profiles.iter().any(|p| &p.name == *name))
            .cloned()
            .collect();
        config.profiles.retain(|p| !names.contains(&p.name));
        self.store.write(&config)?;
        info!(deleted = names.len() - missing.len(), "profiles deleted");
        if !missing.is_empty() {
            return Err(ProfileError::Missing(missing));
        }
        Ok(())
    }

    /// Picks the profile for the current command.
    ///
    /// An explicit name, then `OPENSEARCH_PROFILE`, then the `default`
    /// profile. A name that was asked for (by flag or by environment) but does
    /// not exist is an error; having nothing configured at all is `Ok(None)`.
    pub fn resolve(&self, explicit_name: Option<&str>) -> Result<Option<Profile>, ProfileError> {
        let profiles = self.profiles_map()?;
        if let Some(name) = explicit_name.filter(|name| !name.is_empty()) {
            debug!(profile = name, "resolving profile from argument");
            return profiles
                .get(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| ProfileError::NotFound(name.to_string()));
        }
        if let Some(name) = self.env.var(environment::OPENSEARCH_PROFILE) {
            debug!(profile = %name, "resolving profile from environment");
            return profiles
                .get(&name)
                .cloned()
                .map(Some)
                .ok_or(ProfileError::NotFound(name));
        }
        debug!("resolving default profile");
        Ok(profiles.get(DEFAULT_PROFILE_NAME).cloned())
    }
}
