//! Chain-of-responsibility error handling
//!
//! Every failed attempt produces an `ErrorContext` that walks an ordered
//! handler list. A handler either requests a retry, terminates with a final
//! error, or rewrites the error and passes it to the next handler. Each
//! episode starts at handler index 0; a handler that does not apply passes
//! the error through unchanged.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::endpoint::Endpoint;
use crate::error::{Error, TransportError};

/// Verdict of a single handler for one error-handling episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorHandlingResult {
    /// Re-adapt and resend the request; no further handlers consulted.
    RetryNeeded,
    /// Replace the error and consult the next handler.
    ContinueErrorHandling(Error),
    /// Terminate with this error; no further handlers consulted.
    ContinueFailure(Error),
}

/// What the transport reported, kept alongside the (possibly rewritten)
/// error so handlers can classify on raw evidence.
#[derive(Debug, Clone)]
pub enum RawFailure {
    /// An HTTP response arrived with this status.
    Status { status: u16 },
    /// No response; the transport failed.
    Transport(TransportError),
}

/// One failed attempt as seen by the handler chain.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub endpoint: Arc<Endpoint>,
    /// Current error; rewritten as the episode walks the chain.
    pub error: Error,
    /// Raw failure evidence; never rewritten.
    pub failure: RawFailure,
    /// When the attempt was observed to fail. Load-bearing for the refresh
    /// coordinator's before/after-refresh comparison.
    pub completed_at: Instant,
}

impl ErrorContext {
    pub fn new(
        endpoint: Arc<Endpoint>,
        error: Error,
        failure: RawFailure,
        completed_at: Instant,
    ) -> Self {
        Self {
            endpoint,
            error,
            failure,
            completed_at,
        }
    }

    /// HTTP status of the failed attempt, if a response arrived at all.
    pub fn status(&self) -> Option<u16> {
        match &self.failure {
            RawFailure::Status { status } => Some(*status),
            RawFailure::Transport(_) => None,
        }
    }
}

/// One link in the chain.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn ErrorHandler>`).
pub trait ErrorHandler: Send + Sync {
    fn handle_error<'a>(
        &'a self,
        context: &'a ErrorContext,
    ) -> Pin<Box<dyn Future<Output = ErrorHandlingResult> + Send + 'a>>;
}

/// Terminal outcome of an error-handling episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The caller should re-adapt and resend.
    Retry,
    /// The episode ends; deliver this error.
    Fail(Error),
}

/// Ordered handler list and the driver that walks it.
pub struct ErrorHandlingService {
    handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl ErrorHandlingService {
    pub fn new(handlers: Vec<Arc<dyn ErrorHandler>>) -> Self {
        Self { handlers }
    }

    /// Drive one episode through the chain.
    ///
    /// Handlers are consulted strictly in registration order, starting from
    /// index 0. An empty chain fails with the context's error unchanged.
    pub async fn handle(&self, mut context: ErrorContext) -> ChainOutcome {
        for handler in &self.handlers {
            match handler.handle_error(&context).await {
                ErrorHandlingResult::RetryNeeded => return ChainOutcome::Retry,
                ErrorHandlingResult::ContinueFailure(error) => return ChainOutcome::Fail(error),
                ErrorHandlingResult::ContinueErrorHandling(error) => context.error = error,
            }
        }
        ChainOutcome::Fail(context.error)
    }
}
