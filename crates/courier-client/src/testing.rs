//! Shared test doubles: a scriptable transport and token supplier.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use courier_auth::{AccessToken, TokenSupplier};
use reqwest::Method;

use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::transport::{RawResponse, Transport, TransportRequest};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Expiration far in the future (year 2100).
const FUTURE_EXPIRY: u64 = 4_102_444_800_000;

pub(crate) fn plain_endpoint() -> Arc<Endpoint> {
    Arc::new(Endpoint::new(
        Method::GET,
        "https://api.example.com",
        "/v1/status",
    ))
}

pub(crate) fn authorized_endpoint() -> Arc<Endpoint> {
    Arc::new(authorized_endpoint_owned())
}

pub(crate) fn authorized_endpoint_owned() -> Endpoint {
    Endpoint::new(Method::GET, "https://api.example.com", "/v1/items").authorized()
}

/// Transport that replays a scripted queue of outcomes.
///
/// Records the header set of every attempt so tests can assert what a retry
/// actually put on the wire. An empty queue answers 200 with `{}`.
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    headers_seen: Mutex<Vec<Vec<(String, String)>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            headers_seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Delay every attempt, leaving a window to cancel mid-flight.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn push_status(&self, status: u16, body: &str) {
        lock(&self.responses).push_back(Ok(RawResponse {
            status,
            headers: vec![],
            body: body.as_bytes().to_vec(),
        }));
    }

    pub(crate) fn push_error(&self, error: TransportError) {
        lock(&self.responses).push_back(Err(error));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn headers_of_call(&self, index: usize) -> Vec<(String, String)> {
        lock(&self.headers_seen)[index].clone()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            lock(&self.headers_seen).push(request.headers.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            lock(&self.responses).pop_front().unwrap_or_else(|| {
                Ok(RawResponse {
                    status: 200,
                    headers: vec![],
                    body: b"{}".to_vec(),
                })
            })
        })
    }
}

/// How a `MockSupplier` answers refresh calls.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RefreshBehavior {
    /// Issue `at_refreshed_<n>` and make it the current token.
    Succeed,
    /// Report the refresh token as revoked.
    Fail,
    /// Never complete.
    Stall,
}

/// Token supplier with a scripted refresh outcome and a call counter.
pub(crate) struct MockSupplier {
    token: RwLock<Option<AccessToken>>,
    behavior: Mutex<RefreshBehavior>,
    refreshes: AtomicUsize,
    delay: Option<Duration>,
}

impl MockSupplier {
    pub(crate) fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(AccessToken {
                token: token.into(),
                expires_at: FUTURE_EXPIRY,
            })),
            behavior: Mutex::new(RefreshBehavior::Succeed),
            refreshes: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub(crate) fn without_token() -> Self {
        Self {
            token: RwLock::new(None),
            behavior: Mutex::new(RefreshBehavior::Succeed),
            refreshes: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub(crate) fn with_behavior(self, behavior: RefreshBehavior) -> Self {
        *lock(&self.behavior) = behavior;
        self
    }

    /// Delay refresh completion, leaving a window for failures to queue up.
    pub(crate) fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn set_token(&self, token: &str) {
        *self
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(AccessToken {
            token: token.into(),
            expires_at: FUTURE_EXPIRY,
        });
    }

    pub(crate) fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl TokenSupplier for MockSupplier {
    fn current_token(&self) -> Option<AccessToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn refresh(
        &self,
    ) -> Pin<Box<dyn Future<Output = courier_auth::Result<AccessToken>> + Send + '_>> {
        Box::pin(async move {
            let call = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            let behavior = *lock(&self.behavior);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match behavior {
                RefreshBehavior::Succeed => {
                    let token = AccessToken {
                        token: format!("at_refreshed_{call}"),
                        expires_at: FUTURE_EXPIRY,
                    };
                    self.set_token(&token.token);
                    Ok(token)
                }
                RefreshBehavior::Fail => Err(courier_auth::Error::InvalidCredentials(
                    "refresh token revoked".into(),
                )),
                RefreshBehavior::Stall => {
                    std::future::pending::<courier_auth::Result<AccessToken>>().await
                }
            }
        })
    }
}
