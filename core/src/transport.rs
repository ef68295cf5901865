//! Transport clients and the factory that builds them.
//!
//! # Design
//! The executor never talks to a concrete HTTP library. It asks a
//! `ClientFactory` for an `HttpClient` bound to the base URL, optionally
//! wired to an `Authenticator`, and hands it plain `HttpRequest` values.
//! Tests substitute a factory that returns a scripted client.
//!
//! `DefaultClient` sends blocking requests through `ureq` and async requests
//! through `reqwest`. Both are configured to return 4xx/5xx responses as data
//! so status interpretation stays in the executor. Neither follows
//! redirects: a 3xx is handed back like any other status, so credentials
//! never travel past the first hop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::auth::Authenticator;
use crate::error::{ApiError, TransportError};
use crate::http::{canonical_header_name, HttpMethod, HttpRequest, HttpResponse};

/// Performs the I/O for one request.
///
/// An authenticated client attaches credentials before sending. Errors are
/// either credential/argument errors (nothing was sent) or
/// `ApiError::Transport` (no status line was received).
#[async_trait]
pub trait HttpClient: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;

    async fn send_async(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Builds transport clients bound to a base URL.
pub trait ClientFactory: Send + Sync {
    /// Build a fresh client. `authenticator` is `None` for unauthenticated
    /// calls.
    fn create(
        &self,
        base_url: &Url,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<Box<dyn HttpClient>, ApiError>;
}

pub const DEFAULT_USER_AGENT: &str = concat!("gitlab-core/", env!("CARGO_PKG_VERSION"));

/// Largest response body the blocking transport reads before giving up.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Stateless factory for `DefaultClient`s.
#[derive(Debug, Clone)]
pub struct DefaultClientFactory {
    user_agent: String,
}

impl DefaultClientFactory {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for DefaultClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for DefaultClientFactory {
    fn create(
        &self,
        base_url: &Url,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<Box<dyn HttpClient>, ApiError> {
        let client = DefaultClient::new(base_url.clone(), authenticator, &self.user_agent)?;
        Ok(Box::new(client))
    }
}

/// `ureq` for blocking sends, `reqwest` for async sends.
pub struct DefaultClient {
    base_url: Url,
    authenticator: Option<Arc<dyn Authenticator>>,
    user_agent: String,
    agent: ureq::Agent,
    client: reqwest::Client,
}

impl DefaultClient {
    pub fn new(
        base_url: Url,
        authenticator: Option<Arc<dyn Authenticator>>,
        user_agent: &str,
    ) -> Result<Self, ApiError> {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .build()
            .new_agent();
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(TransportError::Async)?;
        Ok(Self {
            base_url,
            authenticator,
            user_agent: user_agent.to_string(),
            agent,
            client,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticator.is_some()
    }

    /// Attach the user agent and, for authenticated clients, the credential.
    /// Credentials are only ever sent to the base URL's origin.
    fn prepare(&self, mut request: HttpRequest) -> Result<HttpRequest, ApiError> {
        if request.header("User-Agent").is_none() {
            request.headers.push(("User-Agent".to_string(), self.user_agent.clone()));
        }
        if let Some(auth) = &self.authenticator {
            let target = Url::parse(&request.url).map_err(|e| {
                ApiError::InvalidArgument(format!("request url `{}`: {e}", request.url))
            })?;
            if target.origin() != self.base_url.origin() {
                return Err(ApiError::InvalidArgument(format!(
                    "refusing to send credentials to `{}` outside `{}`",
                    target.origin().ascii_serialization(),
                    self.base_url.origin().ascii_serialization()
                )));
            }
            auth.authenticate(&mut request)?;
        }
        debug!(
            method = %request.method,
            url = %request.url,
            authenticated = self.authenticator.is_some(),
            "sending request"
        );
        Ok(request)
    }
}

#[async_trait]
impl HttpClient for DefaultClient {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = self.prepare(request)?;
        Ok(send_blocking(&self.agent, request)?)
    }

    async fn send_async(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = self.prepare(request)?;
        Ok(send_reqwest(&self.client, request).await?)
    }
}

fn decorate<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    if timeout.is_some() {
        builder = builder.config().timeout_global(timeout).build();
    }
    builder
}

fn without_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithoutBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(body.as_bytes()),
        None => builder.call(),
    }
}

fn with_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn send_blocking(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
        timeout,
    } = req;

    let mut response = match method {
        HttpMethod::Get => without_body(decorate(agent.get(&url), &headers, timeout), body),
        HttpMethod::Head => without_body(decorate(agent.head(&url), &headers, timeout), body),
        HttpMethod::Delete => without_body(decorate(agent.delete(&url), &headers, timeout), body),
        HttpMethod::Post => with_body(decorate(agent.post(&url), &headers, timeout), body),
        HttpMethod::Put => with_body(decorate(agent.put(&url), &headers, timeout), body),
        HttpMethod::Patch => with_body(decorate(agent.patch(&url), &headers, timeout), body),
    }?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((canonical_header_name(k.as_str()), v.to_str().ok()?.to_string())))
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_vec()?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

async fn send_reqwest(
    client: &reqwest::Client,
    req: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let method = match req.method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Patch => reqwest::Method::PATCH,
    };

    let mut builder = client.request(method, &req.url);
    for (name, value) in &req.headers {
        builder = builder.header(name, value);
    }
    if let Some(timeout) = req.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(body) = req.body {
        builder = builder.body(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((canonical_header_name(k.as_str()), v.to_str().ok()?.to_string())))
        .collect();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
