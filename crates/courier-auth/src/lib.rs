//! Access tokens and the token supplier boundary
//!
//! The middleware core reads the current access token when adapting requests
//! and asks the supplier to refresh it when the refresh coordinator decides a
//! credential has gone stale. The supplier owns the token; the core never
//! mutates it.
//!
//! Token lifecycle:
//! 1. The embedding application seeds a supplier with an issued credential
//! 2. Adapters read `current_token()` before every send attempt
//! 3. The refresh coordinator calls `refresh()` at most once concurrently
//! 4. A successful refresh replaces the stored token (and refresh token,
//!    when the token endpoint rotates it)

pub mod error;
pub mod supplier;
pub mod token;

pub use error::{Error, Result};
pub use supplier::{OAuthTokenSupplier, TokenSupplier};
pub use token::AccessToken;
