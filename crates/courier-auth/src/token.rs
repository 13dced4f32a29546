//! Access token data
//!
//! `expires_at` is an absolute unix timestamp in milliseconds. Token
//! endpoints report `expires_in` as a seconds delta; the supplier converts
//! it to an absolute timestamp at storage time so expiry checks need no
//! reference point.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// An issued access token with its absolute expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token value
    pub token: String,
    /// Expiration as unix timestamp in milliseconds
    pub expires_at: u64,
}

impl AccessToken {
    /// Build a token from a token-endpoint `expires_in` seconds delta.
    pub fn with_expires_in(token: String, expires_in_secs: u64) -> Self {
        Self {
            token,
            expires_at: now_millis() + expires_in_secs * 1000,
        }
    }

    /// Whether the token has already expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= now_millis()
    }

    /// Whether the token expires within the given window.
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_at <= now_millis() + window.as_millis() as u64
    }
}

/// Current unix time in milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
