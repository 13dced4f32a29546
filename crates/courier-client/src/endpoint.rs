//! Immutable request descriptors
//!
//! An `Endpoint` describes one callable remote operation: where it lives,
//! how to call it, and how its failures map into domain errors. Endpoints
//! are constructed by the caller and read-only afterwards; the mutable
//! per-attempt state lives on `Request`.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;

use crate::error::{Error, TransportError};

/// Endpoint-specific error mapping, consulted before built-in
/// classification. Both hooks default to "no opinion".
pub trait EndpointErrorMapper: Send + Sync {
    /// Map an HTTP status code to a domain error, if this endpoint has one.
    fn error_for_status(&self, _status: u16) -> Option<Error> {
        None
    }

    /// Map a transport failure to a domain error, if this endpoint has one.
    fn error_for_transport(&self, _error: &TransportError) -> Option<Error> {
        None
    }
}

/// Immutable descriptor of a remote operation.
pub struct Endpoint {
    base_url: String,
    path: String,
    method: Method,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    requires_authorization: bool,
    error_mapper: Option<Arc<dyn EndpointErrorMapper>>,
}

impl Endpoint {
    /// Create a descriptor for `method` on `base_url` + `path`.
    pub fn new(method: Method, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            requires_authorization: false,
            error_mapper: None,
        }
    }

    /// Add a static header sent on every attempt.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set the JSON request body.
    pub fn json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark this endpoint as requiring an access token.
    pub fn authorized(mut self) -> Self {
        self.requires_authorization = true;
        self
    }

    /// Attach an endpoint-specific error mapper.
    pub fn error_mapper(mut self, mapper: Arc<dyn EndpointErrorMapper>) -> Self {
        self.error_mapper = Some(mapper);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URL (base joined with path, exactly one separator).
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{base}{}", self.path)
        } else {
            format!("{base}/{}", self.path)
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn requires_authorization(&self) -> bool {
        self.requires_authorization
    }

    /// Domain error for an HTTP status, if a mapper is attached and has one.
    pub fn error_for_status(&self, status: u16) -> Option<Error> {
        self.error_mapper
            .as_ref()
            .and_then(|mapper| mapper.error_for_status(status))
    }

    /// Domain error for a transport failure, if a mapper is attached and has one.
    pub fn error_for_transport(&self, error: &TransportError) -> Option<Error> {
        self.error_mapper
            .as_ref()
            .and_then(|mapper| mapper.error_for_transport(error))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("url", &self.url())
            .field("requires_authorization", &self.requires_authorization)
            .field("has_error_mapper", &self.error_mapper.is_some())
            .finish()
    }
}
