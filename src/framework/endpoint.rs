//! # Endpoint Task Engine
//!
//! Compiles one [`EndpointConfig`] into its command names, a command creator and
//! the task that performs the call.
//!
//! ## Lifecycle of a Request
//!
//! ```text
//! IDLE --request--> start toggle --> AWAITING_CALL --resolve/reject--> end toggle
//!   ^                                                                     |
//!   +------------------------ CompletionMessage <-------------------------+
//! ```
//!
//! The reserved payload key `except` is split off before the call and never sent;
//! it travels with the completion so error handlers can see it.
//!
//! ## Concurrency
//!
//! - [`ConcurrencyMode::Serial`]: the receive loop awaits the whole execution,
//!   so at most one call is in flight and outcomes follow submission order.
//! - [`ConcurrencyMode::Concurrent`]: each request runs in its own spawned task
//!   and the loop goes straight back to receiving. In-flight calls are still
//!   awaited before the loop finishes, so shutdown never cuts a call short.

use crate::framework::command::{Command, CommandCreator};
use crate::framework::config::{ApiPath, ConcurrencyMode, EndpointConfig};
use crate::framework::loading::{LoadingScope, LoadingToggle};
use crate::framework::names::CommandNames;
use crate::framework::router::CompletionMessage;
use crate::framework::settings::Settings;
use crate::framework::task::{Task, TaskContext, TaskFuture};
use crate::framework::transport::build_request;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// What every endpoint of one model shares at compile time.
#[derive(Clone)]
pub struct CompileContext {
    pub model_name: String,
    pub base_path: Option<ApiPath>,
    pub settings: Arc<Settings>,
}

impl CompileContext {
    pub fn new(model_name: impl Into<String>, settings: Arc<Settings>) -> Self {
        Self {
            model_name: model_name.into(),
            base_path: None,
            settings,
        }
    }

    pub fn with_base_path(mut self, base_path: Option<ApiPath>) -> Self {
        self.base_path = base_path;
        self
    }
}

/// Output of [`compile_endpoint`].
pub struct CompiledEndpoint {
    pub names: CommandNames,
    pub creator: CommandCreator,
    /// `None` for `customHandler` endpoints.
    pub task: Option<Box<dyn Task>>,
}

/// Derives names, builds the creator and (unless the endpoint brings its own
/// handler) the task serving `key`.
pub fn compile_endpoint(key: &str, config: EndpointConfig, ctx: &CompileContext) -> CompiledEndpoint {
    let names_model = config.model_name.as_deref().unwrap_or(&ctx.model_name);
    let names = CommandNames::derive(names_model, config.method.as_deref(), key);
    let creator = CommandCreator::new(names.request.clone());

    if config.custom_handler {
        debug!(model = %ctx.model_name, key, "Custom handler, no task generated");
        return CompiledEndpoint {
            names,
            creator,
            task: None,
        };
    }

    let loading = LoadingToggle::plan(&config, ctx.settings.auto_loading());
    let task = EndpointTask {
        model_name: ctx.model_name.clone(),
        names: names.clone(),
        config: Arc::new(config),
        model_base_path: ctx.base_path.clone(),
        settings: ctx.settings.clone(),
        loading,
    };
    CompiledEndpoint {
        names,
        creator,
        task: Some(Box::new(task)),
    }
}

/// The handler task of one endpoint.
pub struct EndpointTask {
    /// Owner of the loading flags; unaffected by a `modelName` override.
    model_name: String,
    names: CommandNames,
    config: Arc<EndpointConfig>,
    model_base_path: Option<ApiPath>,
    settings: Arc<Settings>,
    loading: Option<LoadingToggle>,
}

impl Task for EndpointTask {
    fn name(&self) -> &str {
        &self.names.request
    }

    fn start(self: Box<Self>, ctx: TaskContext) -> TaskFuture {
        let requests = ctx.take(&self.names.request);
        Box::pin(Arc::new(*self).run(requests, ctx))
    }
}

impl EndpointTask {
    async fn run(self: Arc<Self>, mut requests: mpsc::UnboundedReceiver<Command>, ctx: TaskContext) {
        let mode = self.config.concurrency_mode;
        info!(request = %self.names.request, ?mode, "Endpoint task started");

        match mode {
            ConcurrencyMode::Serial => {
                while let Some(command) = requests.recv().await {
                    self.toggle(&ctx, LoadingScope::Start);
                    self.execute(command.payload, &ctx).await;
                }
            }
            ConcurrencyMode::Concurrent => {
                let mut in_flight = JoinSet::new();
                loop {
                    tokio::select! {
                        received = requests.recv() => match received {
                            Some(command) => {
                                self.toggle(&ctx, LoadingScope::Start);
                                let this = self.clone();
                                let ctx = ctx.clone();
                                in_flight.spawn(async move { this.execute(command.payload, &ctx).await });
                            }
                            None => break,
                        },
                        Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                            if let Err(e) = joined {
                                error!(request = %self.names.request, error = %e, "Request execution panicked");
                            }
                        }
                    }
                }
                while let Some(joined) = in_flight.join_next().await {
                    if let Err(e) = joined {
                        error!(request = %self.names.request, error = %e, "Request execution panicked");
                    }
                }
            }
        }

        info!(request = %self.names.request, "Endpoint task stopped");
    }

    /// Calls the transport, emits the end toggle, reports the outcome.
    async fn execute(&self, payload: Value, ctx: &TaskContext) {
        let request = match payload {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let mut data = request.clone();
        let except = data
            .as_object_mut()
            .and_then(|fields| fields.remove("except"))
            .unwrap_or_else(|| Value::Object(Map::new()));

        let descriptor = build_request(&self.config, self.model_base_path.as_ref(), &self.settings, data);
        debug!(uri = %descriptor.uri, method = %descriptor.method, "Sending request");
        let outcome = self.settings.transport().send(descriptor).await;

        self.toggle(ctx, LoadingScope::End);
        if let Err(e) = &outcome {
            error!(
                path = %self.config.path.resolve(),
                payload = %request,
                error = %e,
                "Request failed"
            );
        }

        ctx.complete(CompletionMessage {
            names: self.names.clone(),
            request,
            outcome,
            except,
            endpoint: self.config.clone(),
        });
    }

    fn toggle(&self, ctx: &TaskContext, scope: LoadingScope) {
        if let Some(loading) = &self.loading {
            ctx.put(loading.command(&self.model_name, scope));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::bus::CommandBus;
    use crate::framework::mock::MockTransport;
    use serde_json::json;

    fn compile(config: EndpointConfig, transport: MockTransport) -> CompiledEndpoint {
        let settings = Settings::builder(transport).base_path("/api").build();
        compile_endpoint("getAge", config, &CompileContext::new("test", settings))
    }

    #[test]
    fn test_names_and_creator() {
        let compiled = compile(EndpointConfig::new("/age").with_method("get"), MockTransport::new());
        assert_eq!(compiled.names.request, "api-test-GET-getAge_request");
        assert_eq!(compiled.creator.kind(), compiled.names.request);
        assert_eq!(compiled.task.unwrap().name(), "api-test-GET-getAge_request");
    }

    #[test]
    fn test_model_name_override_affects_names_only() {
        let compiled = compile(
            EndpointConfig::new("/age").with_model_name("other"),
            MockTransport::new(),
        );
        assert_eq!(compiled.names.success, "api-other-POST-getAge_success");
    }

    #[test]
    fn test_custom_handler_has_no_task() {
        let compiled = compile(EndpointConfig::new("/age").with_custom_handler(), MockTransport::new());
        assert!(compiled.task.is_none());
        assert_eq!(compiled.names.error, "api-test-POST-getAge_error");
    }

    #[tokio::test]
    async fn test_except_is_not_sent() {
        let transport = MockTransport::new();
        transport.expect_request().return_ok(json!({ "age": 3 }));

        let compiled = compile(EndpointConfig::new("/age"), transport.clone());
        let bus = CommandBus::new();
        let (sender, mut completions) = mpsc::unbounded_channel();
        let ctx = TaskContext::new(bus.clone(), sender);
        let handle = tokio::spawn(compiled.task.unwrap().start(ctx));

        bus.dispatch(compiled.creator.create(json!({ "name": "x", "except": { "row": 1 } })));
        let done = completions.recv().await.unwrap();

        assert_eq!(done.response(), Some(&json!({ "age": 3 })));
        assert_eq!(done.except, json!({ "row": 1 }));
        assert_eq!(done.request["except"], json!({ "row": 1 }));
        assert_eq!(transport.requests()[0].body.as_deref(), Some(r#"{"name":"x"}"#));

        bus.close();
        handle.await.unwrap();
        transport.verify();
    }
}
