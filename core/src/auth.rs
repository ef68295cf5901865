//! Credential attachment for outgoing requests.
//!
//! # Design
//! `TokenAuthenticator` keeps its credential behind a read-write lock.
//! `authenticate` copies the current value out under the read lock, so a
//! token swapped while requests are in flight is observed whole by each
//! request (old or new), never torn. Swapping takes effect on the next
//! request that reads it.

use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::HttpRequest;

/// Attaches credentials to an outgoing request.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, request: &mut HttpRequest) -> Result<(), ApiError>;
}

/// How the credential travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CredentialScheme {
    /// Personal, project or group access token.
    #[default]
    #[serde(rename = "private_token")]
    PrivateToken,
    /// OAuth2 access token sent as a bearer token.
    #[serde(rename = "oauth")]
    OAuth,
    /// CI job token.
    #[serde(rename = "job_token")]
    JobToken,
}

impl CredentialScheme {
    pub fn header_name(&self) -> &'static str {
        match self {
            CredentialScheme::PrivateToken => "PRIVATE-TOKEN",
            CredentialScheme::OAuth => "Authorization",
            CredentialScheme::JobToken => "JOB-TOKEN",
        }
    }

    fn header_value(&self, token: &str) -> String {
        match self {
            CredentialScheme::OAuth => format!("Bearer {token}"),
            CredentialScheme::PrivateToken | CredentialScheme::JobToken => token.to_string(),
        }
    }
}

/// Token-based authenticator with a replaceable credential.
pub struct TokenAuthenticator {
    scheme: CredentialScheme,
    credential: RwLock<Option<String>>,
}

impl TokenAuthenticator {
    /// Authenticator for a private token.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_scheme(CredentialScheme::PrivateToken, Some(token.into()))
    }

    pub fn with_scheme(scheme: CredentialScheme, token: Option<String>) -> Self {
        Self {
            scheme,
            credential: RwLock::new(token),
        }
    }

    /// Authenticator with no credential yet. Authenticated calls fail with
    /// `MissingCredential` until `set_token` is called.
    pub fn unset(scheme: CredentialScheme) -> Self {
        Self::with_scheme(scheme, None)
    }

    pub fn scheme(&self) -> CredentialScheme {
        self.scheme
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.credential.write() = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.credential.write() = None;
    }

    /// Snapshot of the current credential.
    pub fn token(&self) -> Option<String> {
        self.credential.read().clone()
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        let token = self.token().ok_or(ApiError::MissingCredential)?;
        validate_token(&token)?;
        request.set_header(self.scheme.header_name(), self.scheme.header_value(&token));
        Ok(())
    }
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.credential.read().is_some() {
            "<redacted>"
        } else {
            "<unset>"
        };
        f.debug_struct("TokenAuthenticator")
            .field("scheme", &self.scheme)
            .field("credential", &state)
            .finish()
    }
}

fn validate_token(token: &str) -> Result<(), ApiError> {
    if token.is_empty() {
        return Err(ApiError::InvalidArgument("credential is empty".to_string()));
    }
    if token.chars().any(|c| c.is_control() && c != '\t') {
        return Err(ApiError::InvalidArgument(
            "credential contains characters not allowed in a header value".to_string(),
        ));
    }
    Ok(())
}
