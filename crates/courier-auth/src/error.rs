//! Error types for token supplier operations

/// Errors from token refresh operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Result alias for token supplier operations.
pub type Result<T> = std::result::Result<T, Error>;
