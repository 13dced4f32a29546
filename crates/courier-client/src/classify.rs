//! General-purpose failure classification
//!
//! Rewrites raw `Status`/`Transport` errors into the narrower taxonomy
//! before the rest of the chain runs. The endpoint's own error mapper is
//! consulted first; built-in classification is the fallback. Failures
//! neither side recognizes pass through unchanged.

use std::future::Future;
use std::pin::Pin;

use crate::chain::{ErrorContext, ErrorHandler, ErrorHandlingResult, RawFailure};
use crate::error::{Error, TransportError};

/// Maps status codes and transport failures to classified errors.
pub struct StatusErrorHandler;

impl ErrorHandler for StatusErrorHandler {
    fn handle_error<'a>(
        &'a self,
        context: &'a ErrorContext,
    ) -> Pin<Box<dyn Future<Output = ErrorHandlingResult> + Send + 'a>> {
        let mapped = match &context.failure {
            RawFailure::Status { status } => context
                .endpoint
                .error_for_status(*status)
                .or_else(|| builtin_for_status(*status)),
            RawFailure::Transport(error) => context
                .endpoint
                .error_for_transport(error)
                .or_else(|| builtin_for_transport(error)),
        };
        let result = match mapped {
            Some(error) => ErrorHandlingResult::ContinueErrorHandling(error),
            None => ErrorHandlingResult::ContinueErrorHandling(context.error.clone()),
        };
        Box::pin(async move { result })
    }
}

fn builtin_for_status(status: u16) -> Option<Error> {
    match status {
        401 => Some(Error::Unauthorized),
        403 => Some(Error::Forbidden),
        404 => Some(Error::NotFound),
        _ => None,
    }
}

fn builtin_for_transport(error: &TransportError) -> Option<Error> {
    match error {
        TransportError::NoConnection(_) => Some(Error::NoConnection),
        TransportError::TimedOut(_) => Some(Error::TimedOut),
        TransportError::Cancelled => Some(Error::Cancelled),
        TransportError::Other(_) => None,
    }
}
