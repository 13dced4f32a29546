//! Transport boundary
//!
//! The middleware core is transport-agnostic: it hands a fully-adapted
//! `TransportRequest` to a `Transport` and receives either a `RawResponse`
//! (any status) or a `TransportError` (no response at all). `HttpTransport`
//! is the default implementation over a shared `reqwest::Client`.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::warn;

use crate::error::TransportError;

/// One fully-adapted attempt, ready to put on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

/// Raw HTTP response as received, before decoding or classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response body as text, lossily converted.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one attempt and resolves it exactly once.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Transport>`). Per-attempt cancellation is handled above this
/// boundary by racing the returned future against the request's cancel
/// signal.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + '_>>;
}

/// Default transport over a shared `reqwest::Client`.
///
/// Invalid header names or values are skipped with a warning rather than
/// failing the attempt; connection pooling, TLS, and timeouts are the
/// client's concern.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send_inner(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);

        for (name, value) in &request.headers {
            let name = match HeaderName::from_str(name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            let value = match HeaderValue::from_str(value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            builder = builder.header(name, value);
        }

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(format!("reading response body: {e}")))?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + '_>> {
        Box::pin(self.send_inner(request))
    }
}

/// Map a reqwest failure onto the transport error kinds the classification
/// handler understands.
fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::TimedOut(error.to_string())
    } else if error.is_connect() {
        TransportError::NoConnection(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
