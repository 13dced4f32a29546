//! Request adaptation before every send attempt
//!
//! Adapters mutate a request's headers and nothing else. They run
//! synchronously, in registration order, before the initial attempt and
//! before every retry — which is how a refreshed access token ends up on a
//! retried request without the caller doing anything.

use std::sync::Arc;

use courier_auth::TokenSupplier;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::request::Request;

/// Mutates a request's headers before a send attempt.
///
/// Adapters must be idempotent and infallible; an adapter that has nothing
/// to contribute (e.g. no token issued yet) simply declines.
pub trait RequestAdapter: Send + Sync {
    fn adapt(&self, request: &Request);
}

/// Ordered adapter chain.
pub struct RequestAdaptingService {
    adapters: Vec<Arc<dyn RequestAdapter>>,
}

impl RequestAdaptingService {
    pub fn new(adapters: Vec<Arc<dyn RequestAdapter>>) -> Self {
        Self { adapters }
    }

    /// Run every adapter in registration order.
    pub fn adapt(&self, request: &Request) {
        for adapter in &self.adapters {
            adapter.adapt(request);
        }
    }
}

/// Injects `authorization: Bearer <token>` for endpoints that require it.
pub struct AuthorizationAdapter {
    supplier: Arc<dyn TokenSupplier>,
}

impl AuthorizationAdapter {
    pub fn new(supplier: Arc<dyn TokenSupplier>) -> Self {
        Self { supplier }
    }
}

impl RequestAdapter for AuthorizationAdapter {
    fn adapt(&self, request: &Request) {
        if !request.endpoint().requires_authorization() {
            return;
        }
        match self.supplier.current_token() {
            Some(token) => {
                request.append_header("authorization", &format!("Bearer {}", token.token));
            }
            None => {
                debug!(
                    request_id = %request.id(),
                    "no access token available, sending without authorization"
                );
            }
        }
    }
}

/// Header to inject into outgoing requests (name + value pair from config).
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

/// Injects a static set of headers, e.g. API version or beta flags from
/// config. Refuses to touch the authorization header — that one belongs to
/// `AuthorizationAdapter`.
pub struct HeaderInjectionAdapter {
    headers: Vec<HeaderInjection>,
}

impl HeaderInjectionAdapter {
    pub fn new(headers: Vec<HeaderInjection>) -> Self {
        Self { headers }
    }
}

impl RequestAdapter for HeaderInjectionAdapter {
    fn adapt(&self, request: &Request) {
        for injection in &self.headers {
            if injection.name.eq_ignore_ascii_case("authorization") {
                warn!(header = %injection.name, "refusing to inject authorization header");
                continue;
            }
            request.append_header(&injection.name, &injection.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use crate::testing::MockSupplier;
    use reqwest::Method;

    fn authorized_request() -> Request {
        Request::new(
            Endpoint::new(Method::GET, "https://api.example.com", "/v1/items").authorized(),
        )
    }

    #[test]
    fn authorization_adapter_adds_bearer_header() {
        let supplier = Arc::new(MockSupplier::with_token("at_abc"));
        let adapter = AuthorizationAdapter::new(supplier);
        let request = authorized_request();

        adapter.adapt(&request);

        assert_eq!(
            request.header("authorization").as_deref(),
            Some("Bearer at_abc")
        );
    }

    #[test]
    fn authorization_adapter_declines_without_token() {
        let adapter = AuthorizationAdapter::new(Arc::new(MockSupplier::without_token()));
        let request = authorized_request();

        adapter.adapt(&request);

        assert!(request.header("authorization").is_none());
    }

    #[test]
    fn authorization_adapter_skips_unauthorized_endpoints() {
        let adapter = AuthorizationAdapter::new(Arc::new(MockSupplier::with_token("at_abc")));
        let request = Request::new(Endpoint::new(
            Method::GET,
            "https://api.example.com",
            "/v1/status",
        ));

        adapter.adapt(&request);

        assert!(request.header("authorization").is_none());
    }

    #[test]
    fn header_injection_adds_configured_headers() {
        let adapter = HeaderInjectionAdapter::new(vec![
            HeaderInjection {
                name: "x-api-version".into(),
                value: "2025-06-01".into(),
            },
            HeaderInjection {
                name: "x-client".into(),
                value: "courier".into(),
            },
        ]);
        let request = authorized_request();

        adapter.adapt(&request);

        assert_eq!(request.header("x-api-version").as_deref(), Some("2025-06-01"));
        assert_eq!(request.header("x-client").as_deref(), Some("courier"));
    }

    #[test]
    fn header_injection_refuses_authorization() {
        let adapter = HeaderInjectionAdapter::new(vec![HeaderInjection {
            name: "Authorization".into(),
            value: "Bearer INJECTED".into(),
        }]);
        let request = authorized_request();

        adapter.adapt(&request);

        assert!(request.header("authorization").is_none());
    }

    #[test]
    fn adapters_run_in_registration_order() {
        struct Tag(&'static str);
        impl RequestAdapter for Tag {
            fn adapt(&self, request: &Request) {
                request.append_header("x-tag", self.0);
            }
        }

        let service =
            RequestAdaptingService::new(vec![Arc::new(Tag("first")), Arc::new(Tag("second"))]);
        let request = authorized_request();

        service.adapt(&request);

        // Last writer wins, so registration order is observable.
        assert_eq!(request.header("x-tag").as_deref(), Some("second"));
    }
}
