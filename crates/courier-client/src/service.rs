//! The network service façade
//!
//! Composes the adapter chain, the transport, and the error-handling chain
//! into the per-request attempt loop: adapt → send → on failure, drive the
//! chain → retry or deliver. Retries re-enter the loop from the top, so a
//! token refreshed between attempts lands on the wire via the adapters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_auth::TokenSupplier;
use tracing::debug;

use crate::adapt::{AuthorizationAdapter, HeaderInjectionAdapter, RequestAdaptingService};
use crate::chain::{ChainOutcome, ErrorContext, ErrorHandlingService, RawFailure};
use crate::classify::StatusErrorHandler;
use crate::config::ClientConfig;
use crate::decode::ResponseDecoder;
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::refresh::UnauthorizedErrorHandler;
use crate::request::Request;
use crate::transport::{HttpTransport, Transport};

/// Top-level entry point for sending requests.
pub struct NetworkService {
    transport: Arc<dyn Transport>,
    adapting: RequestAdaptingService,
    error_handling: ErrorHandlingService,
}

impl NetworkService {
    pub fn new(
        transport: Arc<dyn Transport>,
        adapting: RequestAdaptingService,
        error_handling: ErrorHandlingService,
    ) -> Self {
        Self {
            transport,
            adapting,
            error_handling,
        }
    }

    /// Standard wiring: authorization adaptation, classification, and the
    /// refresh coordinator, in that order.
    pub fn with_token_supplier(
        transport: Arc<dyn Transport>,
        supplier: Arc<dyn TokenSupplier>,
    ) -> Self {
        let adapting = RequestAdaptingService::new(vec![Arc::new(AuthorizationAdapter::new(
            Arc::clone(&supplier),
        ))]);
        let error_handling = ErrorHandlingService::new(vec![
            Arc::new(StatusErrorHandler),
            Arc::new(UnauthorizedErrorHandler::new(supplier)),
        ]);
        Self::new(transport, adapting, error_handling)
    }

    /// Standard wiring from a loaded config: reqwest transport with the
    /// configured timeout, static header injections, then the same handler
    /// chain as `with_token_supplier`.
    pub fn from_config(
        config: &ClientConfig,
        supplier: Arc<dyn TokenSupplier>,
    ) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| common::Error::Config(format!("building http client: {e}")))?;
        let transport = Arc::new(HttpTransport::new(client));

        let adapting = RequestAdaptingService::new(vec![
            Arc::new(HeaderInjectionAdapter::new(config.headers.clone())),
            Arc::new(AuthorizationAdapter::new(Arc::clone(&supplier))),
        ]);
        let refresh = UnauthorizedErrorHandler::new(supplier)
            .with_refresh_timeout(Duration::from_secs(config.refresh_timeout_secs));
        let error_handling =
            ErrorHandlingService::new(vec![Arc::new(StatusErrorHandler), Arc::new(refresh)]);

        Ok(Self::new(transport, adapting, error_handling))
    }

    /// Build a request handle for the endpoint.
    pub fn request(&self, endpoint: Endpoint) -> Request {
        Request::new(endpoint)
    }

    /// Drive one send episode to a delivered result.
    ///
    /// Calling `send` again on the same request is a retry: the adapter
    /// chain runs again and a fresh attempt goes out.
    pub async fn send<D: ResponseDecoder>(
        &self,
        request: &Request,
        decoder: &D,
    ) -> Result<D::Output, Error> {
        loop {
            self.adapting.adapt(request);
            let outcome = request.execute(self.transport.as_ref()).await;
            let completed_at = Instant::now();

            let (failure, error) = match outcome {
                Ok(raw) if raw.is_success() => {
                    metrics::counter!("courier_requests_total", "outcome" => "success")
                        .increment(1);
                    return decoder
                        .decode(&raw.body)
                        .map_err(|e| Error::Decode(e.to_string()));
                }
                Ok(raw) => {
                    let status = raw.status;
                    let error = Error::Status {
                        status,
                        body: raw.body_text(),
                    };
                    (RawFailure::Status { status }, error)
                }
                Err(transport_error) => {
                    let error = Error::Transport(transport_error.clone());
                    (RawFailure::Transport(transport_error), error)
                }
            };

            let context = ErrorContext::new(
                Arc::clone(request.endpoint()),
                error,
                failure,
                completed_at,
            );
            match self.error_handling.handle(context).await {
                ChainOutcome::Retry => {
                    debug!(request_id = %request.id(), "retrying after error handling");
                    metrics::counter!("courier_retries_total").increment(1);
                }
                ChainOutcome::Fail(error) => {
                    metrics::counter!("courier_requests_total", "outcome" => "failure")
                        .increment(1);
                    return Err(error);
                }
            }
        }
    }

    /// Reissue a request that has already finished an attempt.
    ///
    /// Returns `None` without sending anything if the request never
    /// finished an attempt; otherwise re-adapts and resends.
    pub async fn retry<D: ResponseDecoder>(
        &self,
        request: &Request,
        decoder: &D,
    ) -> Option<Result<D::Output, Error>> {
        if !request.finished_attempt() {
            return None;
        }
        Some(self.send(request, decoder).await)
    }
}
