//! Error taxonomy for the middleware core
//!
//! Raw failures enter the error-handling chain as `Transport` or `Status`
//! values; the classification handler rewrites them into the narrower
//! variants (or an endpoint-specific domain error) as they travel down the
//! chain. Payloads are strings so errors stay `Clone` — the refresh
//! coordinator fans stored errors back out to multiple waiters.

use thiserror::Error;

/// Failures reported by the transport before any HTTP response exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no internet connection: {0}")]
    NoConnection(String),

    #[error("request timed out: {0}")]
    TimedOut(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("transport failure: {0}")]
    Other(String),
}

/// Errors delivered to callers and passed along the handler chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("no internet connection")]
    NoConnection,

    #[error("request timed out")]
    TimedOut,

    #[error("request cancelled")]
    Cancelled,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("{message}")]
    Domain { code: String, message: String },
}
