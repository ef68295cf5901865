//! Request execution and error translation.
//!
//! # Design
//! `RequestExecutor` owns the base URL, the session's authenticator and a
//! client factory. Each call validates the descriptor, asks the factory for
//! a client (wired to the authenticator only when the call is
//! authenticated), renders the descriptor and sends it. Faults without a
//! status line come back unchanged as `ApiError::Transport`; received
//! responses go through the status table in `status`. Nothing is retried and
//! nothing is swallowed: a call yields one typed response or one error.
//!
//! Async calls suspend only on the transport send, which is raced against
//! the optional deadline and cancellation token.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use url::Url;

use crate::auth::{Authenticator, TokenAuthenticator};
use crate::config::{parse_base_url, ClientConfig};
use crate::descriptor::RequestDescriptor;
use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse, Response};
use crate::pagination::PaginatedResult;
use crate::status;
use crate::transport::{ClientFactory, DefaultClientFactory, HttpClient};

/// Per-call options. A plain `bool` converts into options with only the
/// `authenticate` flag set.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub authenticate: bool,
    /// Overrides the executor's default deadline for this call.
    pub timeout: Option<Duration>,
    /// Async calls stop waiting once the token fires. Blocking calls only
    /// check it before sending.
    pub cancellation: Option<CancellationToken>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            authenticate: true,
            timeout: None,
            cancellation: None,
        }
    }
}

impl ExecuteOptions {
    pub fn unauthenticated() -> Self {
        Self {
            authenticate: false,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl From<bool> for ExecuteOptions {
    fn from(authenticate: bool) -> Self {
        Self {
            authenticate,
            ..Default::default()
        }
    }
}

/// Turns descriptors into typed responses or typed failures.
pub struct RequestExecutor {
    base_url: Url,
    authenticator: Arc<dyn Authenticator>,
    factory: Arc<dyn ClientFactory>,
    default_timeout: Option<Duration>,
}

impl RequestExecutor {
    pub fn new(
        base_url: &str,
        authenticator: Arc<dyn Authenticator>,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            authenticator,
            factory,
            default_timeout: None,
        })
    }

    /// Wire a token authenticator and the default transport from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let authenticator = Arc::new(TokenAuthenticator::with_scheme(
            config.scheme,
            config.token.clone(),
        ));
        let factory = Arc::new(DefaultClientFactory::new().with_user_agent(&config.user_agent));
        let executor = Self::new(&config.base_url, authenticator, factory)?;
        Ok(executor.with_default_timeout(config.timeout()))
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    /// Raw-content call: the body is returned as text, `data` is `None`.
    #[instrument(level = "debug", skip_all, fields(method = %descriptor.method(), resource = %descriptor.resource()))]
    pub fn execute(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<Response<()>, ApiError> {
        let raw = self.send(descriptor, opts.into())?;
        Ok(Response::from_http(raw, None))
    }

    /// Single-item call: the body is deserialized into `data`.
    #[instrument(level = "debug", skip_all, fields(method = %descriptor.method(), resource = %descriptor.resource()))]
    pub fn execute_data<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<Response<T>, ApiError> {
        let raw = self.send(descriptor, opts.into())?;
        let data = deserialize(&raw.body)?;
        Ok(Response::from_http(raw, data))
    }

    pub fn execute_list<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<Response<Vec<T>>, ApiError> {
        self.execute_data(descriptor, opts)
    }

    pub fn execute_paged<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<PaginatedResult<T>, ApiError> {
        self.execute_list(descriptor, opts).map(PaginatedResult::wrap)
    }

    #[instrument(level = "debug", skip_all, fields(method = %descriptor.method(), resource = %descriptor.resource()))]
    pub async fn execute_async(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<Response<()>, ApiError> {
        let raw = self.send_async(descriptor, opts.into()).await?;
        Ok(Response::from_http(raw, None))
    }

    #[instrument(level = "debug", skip_all, fields(method = %descriptor.method(), resource = %descriptor.resource()))]
    pub async fn execute_data_async<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<Response<T>, ApiError> {
        let raw = self.send_async(descriptor, opts.into()).await?;
        let data = deserialize(&raw.body)?;
        Ok(Response::from_http(raw, data))
    }

    pub async fn execute_list_async<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<Response<Vec<T>>, ApiError> {
        self.execute_data_async(descriptor, opts).await
    }

    pub async fn execute_paged_async<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        opts: impl Into<ExecuteOptions>,
    ) -> Result<PaginatedResult<T>, ApiError> {
        self.execute_list_async(descriptor, opts)
            .await
            .map(PaginatedResult::wrap)
    }

    /// Validate, obtain a client and render the request. No I/O happens here.
    fn prepare(
        &self,
        descriptor: &RequestDescriptor,
        opts: &ExecuteOptions,
    ) -> Result<(Box<dyn HttpClient>, HttpRequest), ApiError> {
        descriptor.validate()?;
        let client = if opts.authenticate {
            self.factory
                .create(&self.base_url, Some(Arc::clone(&self.authenticator)))?
        } else {
            self.factory.create(&self.base_url, None)?
        };
        let request = descriptor.to_request(&self.base_url, opts.timeout.or(self.default_timeout))?;
        Ok((client, request))
    }

    fn send(
        &self,
        descriptor: &RequestDescriptor,
        opts: ExecuteOptions,
    ) -> Result<HttpResponse, ApiError> {
        let (client, request) = self.prepare(descriptor, &opts)?;
        if opts.cancellation.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(TransportError::Cancelled.into());
        }
        let response = client.send(request)?;
        check(response)
    }

    async fn send_async(
        &self,
        descriptor: &RequestDescriptor,
        opts: ExecuteOptions,
    ) -> Result<HttpResponse, ApiError> {
        let (client, request) = self.prepare(descriptor, &opts)?;
        let deadline = request.timeout;
        let call = async move {
            match deadline {
                Some(limit) => match tokio::time::timeout(limit, client.send_async(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(ApiError::from(TransportError::TimedOut(limit))),
                },
                None => client.send_async(request).await,
            }
        };
        let response = match opts.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::from(TransportError::Cancelled)),
                result = call => result,
            },
            None => call.await,
        }?;
        check(response)
    }
}

fn check(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    match status::classify(&response) {
        Ok(()) => Ok(response),
        Err(err) => {
            warn!(status = response.status, error = %err, "request failed");
            Err(err)
        }
    }
}

fn deserialize<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::Deserialization(e.to_string()))
}
