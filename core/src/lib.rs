//! Client core for a GitLab-style versioned REST API.
//!
//! # Overview
//! Turns request descriptors into HTTP calls and HTTP responses into typed
//! results or typed failures. Blocking and async call shapes share one
//! pipeline: validate the descriptor, obtain a (possibly authenticated)
//! client from a factory, send, classify the status, deserialize.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`);
//!   only `HttpClient` implementations touch the network, so tests script
//!   them through a substituted `ClientFactory`.
//! - Status codes map to `ApiError` variants through a lookup table;
//!   transport faults are passed through, never reclassified.
//! - Pagination metadata is read from response headers into `Pagination`,
//!   with missing or malformed values as `None`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod http;
pub mod pagination;
pub mod projects;
pub mod status;
pub mod transport;
pub mod types;

pub use auth::{Authenticator, CredentialScheme, TokenAuthenticator};
pub use config::ClientConfig;
pub use descriptor::{ParamValue, Parameter, Placement, RequestDescriptor};
pub use error::{ApiError, TransportError};
pub use executor::{ExecuteOptions, RequestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Response};
pub use pagination::{PaginatedResult, Pagination};
pub use projects::ProjectsRepository;
pub use transport::{ClientFactory, DefaultClient, DefaultClientFactory, HttpClient};
pub use types::{CreateProject, Project, ProjectQuery, UpdateProject, Visibility};

// Re-exported so callers can build `ExecuteOptions` without a direct dependency.
pub use tokio_util::sync::CancellationToken;
