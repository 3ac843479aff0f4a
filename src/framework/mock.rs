//! # Mock Framework
//!
//! Test doubles for the two capabilities the framework calls out to.
//!
//! - [`MockTransport`]: a scripted [`Transport`]. Queue one expectation per call,
//!   run the code under test, then call [`MockTransport::verify`].
//! - [`RecordingNotifier`]: a [`Notifier`] that remembers every message.
//!
//! ```
//! use api_model::framework::mock::MockTransport;
//! use serde_json::json;
//!
//! let transport = MockTransport::new();
//! transport.expect_request().with_method("GET").return_ok(json!({ "age": 3 }));
//! // hand `transport.clone()` to Settings::builder and run the test...
//! ```
//!
//! Expectations are consumed in order, one per request, whatever endpoint sent
//! it. A request with no expectation left, or one that does not match its
//! expectation, resolves to a network error and makes `verify` fail.

use crate::framework::settings::Notifier;
use crate::framework::transport::{Transport, TransportError, TransportRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::warn;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

struct Expectation {
    method: Option<String>,
    uri: Option<String>,
    gate: Option<oneshot::Receiver<()>>,
    response: Result<Value, TransportError>,
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    requests: Vec<TransportRequest>,
    failures: Vec<String>,
}

/// A scripted transport with expectation tracking.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Creates a transport with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects one more request.
    pub fn expect_request(&self) -> RequestExpectationBuilder {
        RequestExpectationBuilder {
            state: self.state.clone(),
            method: None,
            uri: None,
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Calls currently waiting for their response.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Verifies that every expectation was consumed and matched.
    pub fn verify(&self) {
        let state = self.state.lock().unwrap();
        if !state.failures.is_empty() {
            panic!("Unexpected requests: {:?}", state.failures);
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError> {
        let expectation = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.expectations.pop_front()
        };

        let Some(expectation) = expectation else {
            warn!(uri = %request.uri, "No expectation left for request");
            self.fail(format!("{} {} (no expectation)", request.method, request.uri));
            return Err(TransportError::Network("unexpected request".to_string()));
        };

        let method_ok = expectation.method.as_ref().map_or(true, |m| *m == request.method);
        let uri_ok = expectation.uri.as_ref().map_or(true, |u| *u == request.uri);
        if !method_ok || !uri_ok {
            warn!(uri = %request.uri, method = %request.method, "Request does not match expectation");
            self.fail(format!(
                "{} {} (expected {:?} {:?})",
                request.method, request.uri, expectation.method, expectation.uri
            ));
            return Err(TransportError::Network("unexpected request".to_string()));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = expectation.gate {
            // A dropped gate releases the call as well.
            let _ = gate.await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        expectation.response
    }
}

impl MockTransport {
    fn fail(&self, description: String) {
        self.state.lock().unwrap().failures.push(description);
    }
}

/// Builder for request expectations.
pub struct RequestExpectationBuilder {
    state: Arc<Mutex<State>>,
    method: Option<String>,
    uri: Option<String>,
}

impl RequestExpectationBuilder {
    /// Requires the request to use `method`.
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    /// Requires the request to target exactly `uri`.
    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    /// Sets the expectation to resolve with `response`.
    pub fn return_ok(self, response: Value) {
        self.push(Ok(response), None);
    }

    /// Sets the expectation to reject with `error`.
    pub fn return_err(self, error: TransportError) {
        self.push(Err(error), None);
    }

    /// Like [`return_ok`](Self::return_ok), but the call stays in flight until
    /// the returned [`Gate`] is released.
    pub fn return_ok_gated(self, response: Value) -> Gate {
        let (release, gate) = oneshot::channel();
        self.push(Ok(response), Some(gate));
        Gate { release }
    }

    fn push(self, response: Result<Value, TransportError>, gate: Option<oneshot::Receiver<()>>) {
        let mut state = self.state.lock().unwrap();
        state.expectations.push_back(Expectation {
            method: self.method,
            uri: self.uri,
            gate,
            response,
        });
    }
}

/// Holds a gated call in flight.
pub struct Gate {
    release: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

// =============================================================================
// NOTIFICATION RECORDER
// =============================================================================

/// Remembers every success notification, in order.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}
