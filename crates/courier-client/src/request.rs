//! Cancelable, retryable attempt handles
//!
//! A `Request` is the mutable companion of an immutable `Endpoint`: it
//! carries the adapted header set and the state of the current attempt.
//! Exactly one transport attempt may be in flight per request; retries
//! (driven by `NetworkService`) re-enter through the adapter chain so a
//! refreshed credential is re-applied.
//!
//! State transitions:
//! - Created → Sending (attempt started)
//! - Sending → Completed (transport resolved, success or error)
//! - Sending → Cancelled (cancel signal won the race)
//! - Completed/Cancelled → Sending (retry)

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::transport::{RawResponse, Transport, TransportRequest};

/// Lifecycle of the current (or most recent) send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Created,
    Sending,
    Completed,
    Cancelled,
}

struct RequestInner {
    id: Uuid,
    endpoint: Arc<Endpoint>,
    headers: Mutex<HashMap<String, String>>,
    state: Mutex<SendState>,
    in_flight: Mutex<Option<Arc<Notify>>>,
    attempted: AtomicBool,
}

/// Handle to one logical request. Cheap to clone; clones share state, so a
/// caller can keep one handle for cancellation while the service drives
/// attempts with another.
#[derive(Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Request {
    /// Build a request for the endpoint, seeding headers from the
    /// endpoint's static set.
    pub fn new(endpoint: Endpoint) -> Self {
        let mut headers = HashMap::new();
        for (name, value) in endpoint.headers() {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }
        Self {
            inner: Arc::new(RequestInner {
                id: Uuid::new_v4(),
                endpoint: Arc::new(endpoint),
                headers: Mutex::new(headers),
                state: Mutex::new(SendState::Created),
                in_flight: Mutex::new(None),
                attempted: AtomicBool::new(false),
            }),
        }
    }

    /// Request id for log correlation.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.inner.endpoint
    }

    /// Set a header, replacing any existing entry with the same name.
    ///
    /// Header names are case-insensitive; keys are normalized to lowercase
    /// so the header set never holds two entries for one name.
    pub fn append_header(&self, name: &str, value: &str) {
        lock(&self.inner.headers).insert(name.to_ascii_lowercase(), value.to_owned());
    }

    /// Current value of a header, if set.
    pub fn header(&self, name: &str) -> Option<String> {
        lock(&self.inner.headers)
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    /// Snapshot of the current header set.
    pub fn headers(&self) -> Vec<(String, String)> {
        lock(&self.inner.headers)
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn state(&self) -> SendState {
        *lock(&self.inner.state)
    }

    /// Whether at least one attempt has finished (completed or cancelled).
    /// Retrying before the first attempt finished is a no-op.
    pub fn finished_attempt(&self) -> bool {
        self.inner.attempted.load(Ordering::Acquire)
    }

    /// Abort the in-flight attempt, if one exists.
    ///
    /// Returns whether an in-flight attempt was signalled. The cancel
    /// signal races the transport; if the transport resolves first the
    /// attempt still completes normally.
    pub fn cancel(&self) -> bool {
        match lock(&self.inner.in_flight).take() {
            Some(notify) => {
                debug!(request_id = %self.inner.id, "cancelling in-flight attempt");
                notify.notify_one();
                true
            }
            None => false,
        }
    }

    /// Run one transport attempt with the current header set.
    pub(crate) async fn execute(
        &self,
        transport: &dyn Transport,
    ) -> Result<RawResponse, TransportError> {
        {
            let mut state = lock(&self.inner.state);
            if *state == SendState::Sending {
                return Err(TransportError::Other(
                    "a send attempt is already in flight".into(),
                ));
            }
            *state = SendState::Sending;
        }

        let notify = Arc::new(Notify::new());
        *lock(&self.inner.in_flight) = Some(Arc::clone(&notify));

        let transport_request = TransportRequest {
            method: self.inner.endpoint.method().clone(),
            url: self.inner.endpoint.url(),
            headers: self.headers(),
            query: self.inner.endpoint.query().to_vec(),
            body: self.inner.endpoint.body().cloned(),
        };
        debug!(
            request_id = %self.inner.id,
            method = %transport_request.method,
            url = %transport_request.url,
            "sending request"
        );

        let outcome = tokio::select! {
            outcome = transport.send(transport_request) => outcome,
            _ = notify.notified() => Err(TransportError::Cancelled),
        };

        *lock(&self.inner.in_flight) = None;
        *lock(&self.inner.state) = if matches!(outcome, Err(TransportError::Cancelled)) {
            SendState::Cancelled
        } else {
            SendState::Completed
        };
        self.inner.attempted.store(true, Ordering::Release);

        outcome
    }
}
