//! Error types for the REST client.
//!
//! # Design
//! Every documented non-success status of the service gets a dedicated
//! variant so callers can match on meaning instead of numbers. Any other
//! status lands in `Unhandled`, which keeps the numeric code. Faults raised
//! before a status line arrives stay in `Transport` with the original error
//! as their source; they are never reclassified as status errors.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the executor and everything built on top of it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required input was missing or malformed. Raised before any network
    /// call is attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An authenticated call was requested but no credential is set.
    #[error("no credential set for authenticated request")]
    MissingCredential,

    /// The request never produced a status line.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("server error: {0}")]
    ServerError(String),

    /// A status with no dedicated variant.
    #[error("unhandled status code {status}: {message}")]
    Unhandled { status: u16, message: String },

    /// A body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// The HTTP status behind a status-derived error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::MethodNotAllowed(_) => Some(405),
            ApiError::Conflict(_) => Some(409),
            ApiError::Unprocessable(_) => Some(422),
            ApiError::ServerError(_) => Some(500),
            ApiError::Unhandled { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The service-provided message of a status-derived error.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::MethodNotAllowed(m)
            | ApiError::Conflict(m)
            | ApiError::Unprocessable(m)
            | ApiError::ServerError(m)
            | ApiError::Unhandled { message: m, .. } => Some(m),
            _ => None,
        }
    }
}

/// Faults that happen before a response status is received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Blocking transport failure (DNS, connect, TLS, I/O, timeout).
    #[error(transparent)]
    Blocking(#[from] ureq::Error),

    /// Async transport failure.
    #[error(transparent)]
    Async(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("request cancelled")]
    Cancelled,

    /// The rendered request could not be handed to the transport, e.g. a
    /// header value the transport refuses.
    #[error("malformed request: {0}")]
    Malformed(String),
}
