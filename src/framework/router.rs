//! # Completion Router
//!
//! One shared task turns finished requests into outcome commands.
//!
//! Every endpoint task sends a [`CompletionMessage`] when its call resolves or
//! rejects. The router consumes them in arrival order and puts exactly one of:
//!
//! - `{type: error, payload: {req, error, except}}` when the transport failed or
//!   the configured classifier returned a non-null error value;
//! - `{type: success, payload: {req, res}}` otherwise, with `res` passed through
//!   the response post-processor.
//!
//! After a success it performs the endpoint's follow-up actions: navigation
//! (`API_REDIRECT`, preceded by the redirect message) and the success notice.

use crate::framework::bus::CommandBus;
use crate::framework::command::Command;
use crate::framework::config::EndpointConfig;
use crate::framework::names::CommandNames;
use crate::framework::settings::Settings;
use crate::framework::transport::TransportError;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Type of the navigation command put after a successful call with
/// `navigateOnSuccess`.
pub const REDIRECT_COMMAND: &str = "API_REDIRECT";

/// A finished request on its way to the router.
#[derive(Debug, Clone)]
pub struct CompletionMessage {
    pub names: CommandNames,
    /// The full request payload, `except` included.
    pub request: Value,
    pub outcome: Result<Value, TransportError>,
    /// Caller data re-attached to the error command.
    pub except: Value,
    pub endpoint: Arc<EndpointConfig>,
}

impl CompletionMessage {
    pub fn response(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&TransportError> {
        self.outcome.as_ref().err()
    }
}

pub struct CompletionRouter {
    receiver: mpsc::UnboundedReceiver<CompletionMessage>,
    settings: Arc<Settings>,
}

impl CompletionRouter {
    pub fn new(settings: Arc<Settings>) -> (Self, mpsc::UnboundedSender<CompletionMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { receiver, settings }, sender)
    }

    /// Runs until every completion sender is dropped.
    pub async fn run(mut self, bus: CommandBus) {
        info!("Completion router started");
        let mut routed = 0usize;
        while let Some(message) = self.receiver.recv().await {
            self.route(message, &bus);
            routed += 1;
        }
        info!(routed, "Completion router stopped");
    }

    fn route(&self, message: CompletionMessage, bus: &CommandBus) {
        if let Some(error) = self.settings.classify(&message) {
            debug!(kind = %message.names.error, %error, "Request failed");
            bus.dispatch(Command::with_payload(
                message.names.error,
                json!({ "req": message.request, "error": error, "except": message.except }),
            ));
            return;
        }

        let CompletionMessage {
            names,
            request,
            outcome,
            endpoint,
            ..
        } = message;
        let response = outcome.unwrap_or(Value::Null);
        debug!(kind = %names.success, "Request succeeded");
        bus.dispatch(Command::with_payload(
            names.success,
            json!({ "req": request, "res": self.settings.process_response(response) }),
        ));

        if let Some(redirect) = &endpoint.navigate_on_success {
            if let Some(text) = &redirect.message {
                self.settings.notify(text);
            }
            let mut payload = Map::new();
            payload.insert("target".to_string(), Value::String(redirect.target.clone()));
            if let Some(text) = &redirect.message {
                payload.insert("message".to_string(), Value::String(text.clone()));
            }
            bus.dispatch(Command::with_payload(REDIRECT_COMMAND, Value::Object(payload)));
        }
        if let Some(text) = endpoint.notify_on_success.as_ref().and_then(|n| n.text()) {
            self.settings.notify(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::config::Redirect;
    use crate::framework::mock::{MockTransport, RecordingNotifier};

    fn message(outcome: Result<Value, TransportError>, endpoint: EndpointConfig) -> CompletionMessage {
        CompletionMessage {
            names: CommandNames::derive("test", Some("GET"), "get"),
            request: json!({ "id": 1, "except": { "row": 3 } }),
            outcome,
            except: json!({ "row": 3 }),
            endpoint: Arc::new(endpoint),
        }
    }

    #[tokio::test]
    async fn test_success_then_follow_ups() {
        let notifier = RecordingNotifier::new();
        let settings = Settings::builder(MockTransport::new())
            .process_response(|res| res["data"].clone())
            .notifier(notifier.clone())
            .build();
        let bus = CommandBus::new();
        let mut all = bus.tap();
        let (router, sender) = CompletionRouter::new(settings);
        let handle = tokio::spawn(router.run(bus.clone()));

        let endpoint = EndpointConfig::new("/a")
            .with_notify_on_success("saved")
            .with_navigate_on_success(Redirect::new("UserList").with_message("moving on"));
        sender.send(message(Ok(json!({ "data": [1] })), endpoint)).unwrap();
        drop(sender);
        handle.await.unwrap();

        let success = all.recv().await.unwrap();
        assert_eq!(success.kind, "api-test-GET-get_success");
        assert_eq!(success.payload["res"], json!([1]));
        assert_eq!(success.payload["req"]["id"], json!(1));

        let redirect = all.recv().await.unwrap();
        assert_eq!(redirect.kind, REDIRECT_COMMAND);
        assert_eq!(redirect.payload, json!({ "target": "UserList", "message": "moving on" }));
        assert!(all.try_recv().is_err());

        assert_eq!(notifier.messages(), ["moving on", "saved"]);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_except() {
        let settings = Settings::builder(MockTransport::new()).build();
        let bus = CommandBus::new();
        let mut all = bus.tap();
        let (router, sender) = CompletionRouter::new(settings);
        let handle = tokio::spawn(router.run(bus.clone()));

        sender
            .send(message(
                Err(TransportError::Status { status: 404 }),
                EndpointConfig::new("/a").with_notify_on_success("never shown"),
            ))
            .unwrap();
        drop(sender);
        handle.await.unwrap();

        let error = all.recv().await.unwrap();
        assert_eq!(error.kind, "api-test-GET-get_error");
        assert_eq!(error.payload["error"]["status"], json!(404));
        assert_eq!(error.payload["except"], json!({ "row": 3 }));
        assert!(all.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_classifier_turns_response_into_error() {
        let notifier = RecordingNotifier::new();
        let settings = Settings::builder(MockTransport::new())
            .error_classifier(|done| {
                let res = done.response()?;
                (res["code"] != 200).then(|| res.clone())
            })
            .notifier(notifier.clone())
            .build();
        let bus = CommandBus::new();
        let mut all = bus.tap();
        let (router, sender) = CompletionRouter::new(settings);
        let handle = tokio::spawn(router.run(bus.clone()));

        let endpoint = EndpointConfig::new("/a").with_notify_on_success("saved");
        sender.send(message(Ok(json!({ "code": 503 })), endpoint.clone())).unwrap();
        sender.send(message(Ok(json!({ "code": 200 })), endpoint)).unwrap();
        drop(sender);
        handle.await.unwrap();

        let first = all.recv().await.unwrap();
        assert_eq!(first.kind, "api-test-GET-get_error");
        assert_eq!(first.payload["error"]["code"], json!(503));
        let second = all.recv().await.unwrap();
        assert_eq!(second.kind, "api-test-GET-get_success");
        assert_eq!(notifier.messages(), ["saved"]);
    }

    #[tokio::test]
    async fn test_null_verdict_is_success() {
        let settings = Settings::builder(MockTransport::new())
            .error_classifier(|done| done.response().map(|res| res["error"].clone()))
            .build();
        let bus = CommandBus::new();
        let mut all = bus.tap();
        let (router, sender) = CompletionRouter::new(settings);
        let handle = tokio::spawn(router.run(bus.clone()));

        let endpoint = EndpointConfig::new("/a");
        sender.send(message(Ok(json!({ "code": 200 })), endpoint.clone())).unwrap();
        sender
            .send(message(Ok(json!({ "error": { "why": "quota" } })), endpoint))
            .unwrap();
        drop(sender);
        handle.await.unwrap();

        let first = all.recv().await.unwrap();
        assert_eq!(first.kind, "api-test-GET-get_success");
        let second = all.recv().await.unwrap();
        assert_eq!(second.kind, "api-test-GET-get_error");
        assert_eq!(second.payload["error"], json!({ "why": "quota" }));
        assert!(all.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_classifier_sees_request_and_names() {
        let settings = Settings::builder(MockTransport::new())
            .error_classifier(|done| {
                (done.request["id"] == 1 && done.names.request.ends_with("get_request"))
                    .then(|| json!({ "rejected": done.request["id"] }))
            })
            .build();
        let bus = CommandBus::new();
        let mut all = bus.tap();
        let (router, sender) = CompletionRouter::new(settings);
        let handle = tokio::spawn(router.run(bus.clone()));

        sender.send(message(Ok(json!({})), EndpointConfig::new("/a"))).unwrap();
        sender
            .send(message(
                Err(TransportError::Status { status: 500 }),
                EndpointConfig::new("/a"),
            ))
            .unwrap();
        drop(sender);
        handle.await.unwrap();

        let classified = all.recv().await.unwrap();
        assert_eq!(classified.payload["error"], json!({ "rejected": 1 }));
        let failed = all.recv().await.unwrap();
        assert_eq!(failed.payload["error"]["status"], json!(500));
    }

    #[test]
    fn test_notice_true_shows_nothing() {
        let endpoint = EndpointConfig {
            notify_on_success: Some(crate::framework::config::SuccessNotice::Enabled(true)),
            ..EndpointConfig::new("/a")
        };
        assert_eq!(endpoint.notify_on_success.unwrap().text(), None);
    }
}
