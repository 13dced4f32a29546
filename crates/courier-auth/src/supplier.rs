//! Token supplier boundary and the OAuth refresh-grant implementation
//!
//! `TokenSupplier` is the contract the middleware core depends on. The
//! refresh coordinator guarantees `refresh()` is invoked at most once
//! concurrently; implementations do not need their own single-flight
//! handling.

use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use common::Secret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::token::AccessToken;

/// Source of access tokens for authorized endpoints.
///
/// `current_token` is a cheap synchronous read so request adapters can call
/// it on every send attempt. `refresh` exchanges the stored credential for a
/// new access token; the caller serializes invocations.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TokenSupplier>`).
pub trait TokenSupplier: Send + Sync {
    /// The currently-issued access token, if any.
    fn current_token(&self) -> Option<AccessToken>;

    /// Obtain a fresh access token, replacing the current one.
    ///
    /// Called at most once concurrently (the refresh coordinator guarantees
    /// this). Success must make the new token visible to `current_token`
    /// before the returned future resolves.
    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + '_>>;
}

/// Response from an OAuth token endpoint for the refresh grant.
///
/// `expires_in` is a seconds delta from the response time; it is converted
/// to an absolute unix millisecond timestamp when stored.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

/// Token supplier backed by an OAuth `refresh_token` grant.
///
/// Holds the rotating refresh token behind a `Secret` so it never reaches
/// logs. When the token endpoint rotates the refresh token, the stored one
/// is replaced along with the access token.
pub struct OAuthTokenSupplier {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    refresh_token: RwLock<Secret<String>>,
    current: RwLock<Option<AccessToken>>,
}

impl OAuthTokenSupplier {
    /// Create a supplier for the given token endpoint and client id.
    ///
    /// `current` may be `None` on cold start; adapters then skip the
    /// authorization header until the first refresh completes.
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: Secret<String>,
        current: Option<AccessToken>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            refresh_token: RwLock::new(refresh_token),
            current: RwLock::new(current),
        }
    }

    async fn refresh_inner(&self) -> Result<AccessToken> {
        let refresh_token = self
            .refresh_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .expose()
            .clone();

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));

            // 401/403 means the refresh token is revoked or invalid
            if status.as_u16() == 401 || status.as_u16() == 403 {
                warn!(%status, "refresh token rejected by token endpoint");
                return Err(Error::InvalidCredentials(format!(
                    "refresh token rejected ({status}): {body}"
                )));
            }

            return Err(Error::Refresh(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::Refresh(format!("invalid refresh response: {e}")))?;

        let token =
            AccessToken::with_expires_in(token_response.access_token, token_response.expires_in);

        if let Some(rotated) = token_response.refresh_token {
            *self
                .refresh_token
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Secret::new(rotated);
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

        info!(expires_at = token.expires_at, "access token refreshed");
        Ok(token)
    }
}

impl TokenSupplier for OAuthTokenSupplier {
    fn current_token(&self) -> Option<AccessToken> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + '_>> {
        Box::pin(self.refresh_inner())
    }
}
