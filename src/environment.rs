//! Process environment consulted while resolving profiles and building gateways.
//!
//! All lookups go through the [`Env`] trait so that resolution rules can be
//! exercised against a [`StaticEnv`] without mutating the real process
//! environment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const OPENSEARCH_CONFIG: &str = "OPENSEARCH_CONFIG";
pub const OPENSEARCH_ENDPOINT: &str = "OPENSEARCH_ENDPOINT";
pub const OPENSEARCH_MAX_RETRY: &str = "OPENSEARCH_MAX_RETRY";
pub const OPENSEARCH_PASSWORD: &str = "OPENSEARCH_PASSWORD";
pub const OPENSEARCH_PROFILE: &str = "OPENSEARCH_PROFILE";
pub const OPENSEARCH_TIMEOUT: &str = "OPENSEARCH_TIMEOUT";
pub const OPENSEARCH_USER: &str = "OPENSEARCH_USER";

/// Read access to environment variables.
pub trait Env: Send + Sync {
    /// Returns the value of `key`, or `None` when it is unset or not valid unicode.
    fn var(&self, key: &str) -> Option<String>;
}

impl<E: Env + ?Sized> Env for Arc<E> {
    fn var(&self, key: &str) -> Option<String> {
        self.as_ref().var(key)
    }
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of variables, used by tests and by callers that want to pin
/// resolution to a known environment.
#[derive(Debug, Default, Clone)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Non-empty value of `key`, trimmed.
pub fn non_empty(env: &dyn Env, key: &str) -> Option<String> {
    env.var(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Retry ceiling override. Malformed or negative values are ignored.
pub fn max_retry_override(env: &dyn Env) -> Option<u32> {
    non_empty(env, OPENSEARCH_MAX_RETRY).and_then(|value| value.parse::<u32>().ok())
}

/// Request timeout override in seconds. Malformed or negative values are ignored.
pub fn timeout_override(env: &dyn Env) -> Option<Duration> {
    non_empty(env, OPENSEARCH_TIMEOUT)
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}
