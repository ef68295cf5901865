//! Client configuration.
//!
//! Loadable from any serde source (all fields defaulted) or from the
//! `GITLAB_URL`, `GITLAB_TOKEN`, `GITLAB_TOKEN_SCHEME` and
//! `GITLAB_TIMEOUT_SECS` environment variables.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::CredentialScheme;
use crate::error::ApiError;
use crate::transport::DEFAULT_USER_AGENT;

pub const DEFAULT_BASE_URL: &str = "https://gitlab.com/api/v4";

pub const ENV_BASE_URL: &str = "GITLAB_URL";
pub const ENV_TOKEN: &str = "GITLAB_TOKEN";
pub const ENV_TOKEN_SCHEME: &str = "GITLAB_TOKEN_SCHEME";
pub const ENV_TIMEOUT_SECS: &str = "GITLAB_TIMEOUT_SECS";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Versioned API root, e.g. `https://gitlab.example.com/api/v4`.
    pub base_url: String,
    pub token: Option<String>,
    pub scheme: CredentialScheme,
    /// Per-request deadline; unset means no deadline.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            scheme: CredentialScheme::default(),
            timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_scheme(mut self, scheme: CredentialScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_BASE_URL) {
            config.base_url = url;
        }
        config.token = lookup(ENV_TOKEN).filter(|t| !t.is_empty());
        if let Some(scheme) = lookup(ENV_TOKEN_SCHEME) {
            config.scheme = serde_json::from_value(serde_json::Value::String(scheme.clone()))
                .map_err(|_| {
                    ApiError::InvalidArgument(format!("{ENV_TOKEN_SCHEME}: unknown scheme `{scheme}`"))
                })?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs = secs.trim().parse().map_err(|_| {
                ApiError::InvalidArgument(format!("{ENV_TIMEOUT_SECS}: `{secs}` is not a number"))
            })?;
            config.timeout_secs = Some(secs);
        }
        Ok(config)
    }

    pub fn parsed_base_url(&self) -> Result<Url, ApiError> {
        parse_base_url(&self.base_url)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("scheme", &self.scheme)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Parse and check a base endpoint: it must be an absolute http(s) URL that
/// can carry a path.
pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::InvalidArgument("base url is empty".to_string()));
    }
    let url = Url::parse(raw)
        .map_err(|e| ApiError::InvalidArgument(format!("base url `{raw}`: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ApiError::InvalidArgument(format!(
            "base url `{raw}` must be an http or https url"
        )));
    }
    Ok(url)
}
