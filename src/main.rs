//! # API Model Demo
//!
//! Runs one model against an in-memory backend:
//!
//! 1. A `users` REST resource and a `ping` endpoint are declared.
//! 2. The model is mounted on a [`Runtime`].
//! 3. A few request commands are dispatched and the outcome commands logged.

use api_model::framework::{
    ApiErrorMiddleware, Command, EndpointConfig, Handlers, ModelBuilder, Notifier,
    ResourceConfig, Settings, ShowLoadingMiddleware, Transport, TransportError, TransportRequest,
};
use api_model::lifecycle::{setup_tracing, Runtime};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{info, warn};

/// A tiny users table served over the [`Transport`] seam.
#[derive(Default)]
struct InMemoryBackend {
    users: Mutex<BTreeMap<u64, Value>>,
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError> {
        let mut users = self
            .users
            .lock()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let path = request.uri.split('?').next().unwrap_or_default();
        let id = path
            .strip_prefix("/api/users/")
            .and_then(|id| id.parse::<u64>().ok());

        match (request.method.as_str(), path, id) {
            ("GET", "/api/ping", _) => Ok(json!({ "code": 200, "data": "pong" })),
            ("GET", "/api/users", _) => {
                Ok(json!({ "code": 200, "data": users.values().cloned().collect::<Vec<_>>() }))
            }
            ("POST", "/api/users", _) => {
                let body: Value = request
                    .body
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()
                    .map_err(|e| TransportError::Decode(e.to_string()))?
                    .unwrap_or_default();
                let id = users.len() as u64 + 1;
                let user = json!({ "id": id, "name": body["name"] });
                users.insert(id, user.clone());
                Ok(json!({ "code": 200, "data": user }))
            }
            ("DELETE", _, Some(id)) => match users.remove(&id) {
                Some(user) => Ok(json!({ "code": 200, "data": user })),
                None => Ok(json!({ "code": 404, "message": "no such user" })),
            },
            _ => Err(TransportError::Status { status: 404 }),
        }
    }
}

struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, text: &str) {
        info!(text, "Notification");
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();
    info!("Starting API model demo");

    let settings = Settings::builder(InMemoryBackend::default())
        .base_path("/api")
        .auto_loading(true)
        .error_classifier(|done| {
            let res = done.response()?;
            (res["code"] != 200).then(|| res.clone())
        })
        .process_response(|res| res["data"].clone())
        .notifier(LogNotifier)
        .build();

    let mut users = ModelBuilder::new("users")
        .api("ping", EndpointConfig::new("/ping").with_method("GET"))
        .rest(
            "users",
            ResourceConfig::new("/users").with_show_loading("spinner"),
        )
        .initial_state(json!({ "loading": false, "list": [] }))
        .reducer(|names| {
            let users = &names.rest["users"];
            let created = users.create.success.clone();
            Handlers::new()
                .on(users.index.success.clone(), |state, command| {
                    state["list"] = command.payload["res"].clone();
                })
                .on(created, |state, command| {
                    if let Some(list) = state["list"].as_array_mut() {
                        list.push(command.payload["res"].clone());
                    }
                })
                .into_reducer()
        })
        .build(&settings);

    let mut runtime = Runtime::new(settings.clone());
    runtime.add_middleware(ShowLoadingMiddleware::new(
        |tag| info!(tag = %tag.to_value(), "Spinner on"),
        |tag| info!(tag = %tag.to_value(), "Spinner off"),
    ));
    runtime.add_middleware(ApiErrorMiddleware::new(|command: &Command| {
        warn!(kind = %command.kind, error = %command.payload["error"], "API error");
    }));
    runtime.mount(&mut users);

    let mut outcomes = runtime.tap();
    let rest = &users.creators.rest["users"];
    runtime.dispatch(users.creators.api["ping"].call());
    runtime.dispatch(rest.create.create(json!({ "name": "Alice" })));
    runtime.dispatch(rest.create.create(json!({ "name": "Bob" })));
    runtime.dispatch(rest.destroy.create(json!({ "id": 42 })));
    runtime.dispatch(rest.index.call());

    let mut remaining = 5;
    while remaining > 0 {
        let Some(command) = outcomes.recv().await else {
            break;
        };
        if command.kind.ends_with("_success") || command.kind.ends_with("_error") {
            info!(kind = %command.kind, payload = %command.payload, "Outcome");
            remaining -= 1;
        }
    }

    info!(state = ?runtime.state("users"), "Final state");
    runtime.shutdown().await.map_err(|e| e.to_string())
}
