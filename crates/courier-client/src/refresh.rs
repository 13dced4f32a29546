//! Token refresh coordination for unauthorized responses
//!
//! With many requests in flight, 401 responses and the refresh completion
//! interleave arbitrarily. This handler coalesces every concurrent refresh
//! requirement into one outstanding supplier call, then fans the outcome
//! out to all queued failures. A failure that completed *before* the last
//! refresh resolved was caused by the superseded token and already has its
//! verdict; a failure that completed *at or after* it is fresh evidence and
//! starts a new refresh.
//!
//! Coordinator lifecycle:
//! 1. First qualifying 401 arrives → queue it, start one refresh
//! 2. Further 401s while the refresh runs → queue only
//! 3. Refresh completes → record the resolution instant, drain the queue
//! 4. Later 401s compare their completion instant against the resolution

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_auth::TokenSupplier;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::chain::{ErrorContext, ErrorHandler, ErrorHandlingResult};

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the coordinator stands with respect to token refresh.
///
/// Transitions:
/// - Idle → InFlight (first qualifying 401 queued)
/// - InFlight → Resolved (supplier call completed)
/// - Resolved → InFlight (401 that postdates the resolution)
#[derive(Debug, Clone, Copy)]
enum RefreshState {
    Idle,
    InFlight,
    Resolved {
        completed_at: Instant,
        succeeded: bool,
    },
}

/// A 401 waiting for the in-flight refresh to settle.
struct PendingFailure {
    error: crate::error::Error,
    completed_at: Instant,
    resolve: oneshot::Sender<ErrorHandlingResult>,
}

struct CoordinatorState {
    refresh: RefreshState,
    pending: Vec<PendingFailure>,
}

/// The one stateful handler in the pipeline.
///
/// All reads and writes of `RefreshState` and the pending queue happen
/// under a single mutex; the supplier call itself runs outside that
/// critical section, and its completion re-enters it to drain the queue
/// atomically with the state transition. The supplier is therefore never
/// invoked more than once concurrently.
pub struct UnauthorizedErrorHandler {
    supplier: Arc<dyn TokenSupplier>,
    state: Arc<Mutex<CoordinatorState>>,
    refresh_timeout: Duration,
}

impl UnauthorizedErrorHandler {
    pub fn new(supplier: Arc<dyn TokenSupplier>) -> Self {
        Self {
            supplier,
            state: Arc::new(Mutex::new(CoordinatorState {
                refresh: RefreshState::Idle,
                pending: Vec::new(),
            })),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Bound how long a queued failure waits for a stalled refresh before
    /// resolving itself to a failure.
    pub fn with_refresh_timeout(mut self, refresh_timeout: Duration) -> Self {
        self.refresh_timeout = refresh_timeout;
        self
    }

    async fn coordinate(&self, context: &ErrorContext) -> ErrorHandlingResult {
        let receiver = {
            let mut state = self.state.lock().await;

            if let RefreshState::Resolved {
                completed_at,
                succeeded,
            } = state.refresh
            {
                if context.completed_at < completed_at {
                    // The failing attempt used the superseded token; the
                    // resolution already holds its verdict.
                    return if succeeded {
                        debug!("401 predates successful refresh, retrying with fresh token");
                        ErrorHandlingResult::RetryNeeded
                    } else {
                        debug!("401 predates failed refresh, failing without a new refresh");
                        ErrorHandlingResult::ContinueFailure(context.error.clone())
                    };
                }
                // Completed at or after the resolution: fresh evidence of a
                // newly-expired token.
            }

            let (sender, receiver) = oneshot::channel();
            state.pending.push(PendingFailure {
                error: context.error.clone(),
                completed_at: context.completed_at,
                resolve: sender,
            });
            metrics::counter!("courier_refresh_waiters_total").increment(1);

            if !matches!(state.refresh, RefreshState::InFlight) {
                state.refresh = RefreshState::InFlight;
                self.spawn_refresh();
            }
            receiver
        };

        match tokio::time::timeout(self.refresh_timeout, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) | Err(_) => {
                warn!(
                    timeout_secs = self.refresh_timeout.as_secs(),
                    "refresh did not settle in time, failing queued request"
                );
                ErrorHandlingResult::ContinueFailure(context.error.clone())
            }
        }
    }

    fn spawn_refresh(&self) {
        let supplier = Arc::clone(&self.supplier);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let outcome = supplier.refresh().await;
            let succeeded = outcome.is_ok();
            match &outcome {
                Ok(token) => info!(expires_at = token.expires_at, "token refresh succeeded"),
                Err(error) => warn!(%error, "token refresh failed"),
            }
            metrics::counter!(
                "courier_token_refreshes_total",
                "outcome" => if succeeded { "succeeded" } else { "failed" }
            )
            .increment(1);

            let mut state = state.lock().await;
            state.refresh = RefreshState::Resolved {
                completed_at: Instant::now(),
                succeeded,
            };
            for entry in state.pending.drain(..) {
                debug!(queued_for = ?entry.completed_at.elapsed(), "resolving queued failure");
                let verdict = if succeeded {
                    ErrorHandlingResult::RetryNeeded
                } else {
                    ErrorHandlingResult::ContinueErrorHandling(entry.error)
                };
                // A waiter that timed out has dropped its receiver; skip it.
                let _ = entry.resolve.send(verdict);
            }
        });
    }
}

impl ErrorHandler for UnauthorizedErrorHandler {
    fn handle_error<'a>(
        &'a self,
        context: &'a ErrorContext,
    ) -> Pin<Box<dyn Future<Output = ErrorHandlingResult> + Send + 'a>> {
        Box::pin(async move {
            if !context.endpoint.requires_authorization() || context.status() != Some(401) {
                return ErrorHandlingResult::ContinueErrorHandling(context.error.clone());
            }
            self.coordinate(context).await
        })
    }
}
