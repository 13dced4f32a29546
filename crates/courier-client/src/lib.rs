//! HTTP client middleware core
//!
//! Adapts outgoing requests, decodes responses, and recovers from
//! authorization failures by coordinating a single race-safe token refresh
//! across many concurrently in-flight requests, then retrying the affected
//! requests.
//!
//! Request lifecycle:
//! 1. `NetworkService::request` builds a `Request` from an `Endpoint`
//! 2. The adapter chain injects headers (authorization, static injections)
//! 3. The transport sends the attempt; cancellation races the send
//! 4. A failure walks the error-handling chain: classification first, the
//!    refresh coordinator second
//! 5. A retry verdict re-enters at step 2, so a refreshed token is applied;
//!    a failure verdict delivers exactly one error to the caller

pub mod adapt;
pub mod chain;
pub mod classify;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod refresh;
pub mod request;
pub mod service;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use adapt::{
    AuthorizationAdapter, HeaderInjection, HeaderInjectionAdapter, RequestAdapter,
    RequestAdaptingService,
};
pub use chain::{
    ChainOutcome, ErrorContext, ErrorHandler, ErrorHandlingResult, ErrorHandlingService,
    RawFailure,
};
pub use classify::StatusErrorHandler;
pub use config::ClientConfig;
pub use decode::{DecodeError, JsonDecoder, ResponseDecoder, StringDecoder, UnitDecoder};
pub use endpoint::{Endpoint, EndpointErrorMapper};
pub use error::{Error, TransportError};
pub use refresh::UnauthorizedErrorHandler;
pub use request::{Request, SendState};
pub use reqwest::Method;
pub use service::NetworkService;
pub use transport::{HttpTransport, RawResponse, Transport, TransportRequest};
