use crate::framework::{
    Command, CommandBus, CompletionMessage, CompletionRouter, FrameworkError, Middleware, Model,
    Settings, TaskContext,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Hosts models: their state slices, their tasks and the completion router.
///
/// # Architecture
///
/// - One [`CommandBus`] shared by every model and task.
/// - One [`CompletionRouter`] task fed by every endpoint task.
/// - One tokio task per model task, started when the model is mounted.
///
/// # Example
///
/// ```
/// # use api_model::framework::{EndpointConfig, ModelBuilder, Settings, mock::MockTransport};
/// # use api_model::lifecycle::Runtime;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), api_model::framework::FrameworkError> {
/// let settings = Settings::builder(MockTransport::new()).build();
/// let mut runtime = Runtime::new(settings.clone());
///
/// let mut model = ModelBuilder::new("users")
///     .api("list", EndpointConfig::new("/users").with_method("GET"))
///     .build(&settings);
/// runtime.mount(&mut model);
///
/// runtime.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct Runtime {
    bus: CommandBus,
    completions: mpsc::UnboundedSender<CompletionMessage>,
    router: JoinHandle<()>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Runtime {
    /// Creates the bus and starts the completion router.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(settings: Arc<Settings>) -> Self {
        let bus = CommandBus::new();
        let (router, completions) = CompletionRouter::new(settings);
        let router = tokio::spawn(router.run(bus.clone()));
        info!("Runtime started");

        Self {
            bus,
            completions,
            router,
            handles: Vec::new(),
        }
    }

    pub fn add_middleware(&self, middleware: impl Middleware + 'static) {
        self.bus.add_middleware(Arc::new(middleware));
    }

    /// Mounts the model's state slice and starts its tasks.
    ///
    /// Tasks are moved out of the model, so mounting the same model again only
    /// replaces its state slice.
    pub fn mount(&mut self, model: &mut Model) {
        self.bus
            .mount_slice(&model.name, model.initial_state.clone(), Some(model.reducer()));

        let ctx = TaskContext::new(self.bus.clone(), self.completions.clone());
        let tasks = model.take_tasks();
        let started = tasks.len();
        for task in tasks {
            let name = task.name().to_string();
            let future = task.start(ctx.clone());
            debug!(model = %model.name, task = %name, "Task scheduled");
            self.handles.push((name, tokio::spawn(future)));
        }
        info!(model = %model.name, tasks = started, "Model mounted");
    }

    pub fn dispatch(&self, command: Command) {
        self.bus.dispatch(command);
    }

    /// Snapshot of a model's state slice.
    pub fn state(&self, model_name: &str) -> Option<Value> {
        self.bus.state(model_name)
    }

    /// Every command dispatched from now on, in dispatch order.
    pub fn tap(&self) -> mpsc::UnboundedReceiver<Command> {
        self.bus.tap()
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    /// Gracefully shuts down every task.
    ///
    /// 1. Closes the bus, which ends every task's receive loop. Calls already in
    ///    flight still finish, but their outcome commands are no longer delivered.
    /// 2. Waits for every task.
    /// 3. Drops the last completion sender and waits for the router to drain.
    ///
    /// Returns the first task that panicked, if any.
    pub async fn shutdown(self) -> Result<(), FrameworkError> {
        info!("Shutting down runtime...");
        self.bus.close();

        let mut failure = None;
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(task = %name, error = %e, "Task failed");
                failure.get_or_insert(FrameworkError::TaskFailed {
                    name,
                    reason: e.to_string(),
                });
            }
        }

        drop(self.completions);
        if let Err(e) = self.router.await {
            error!(error = %e, "Completion router failed");
            failure.get_or_insert(FrameworkError::TaskFailed {
                name: "completion-router".to_string(),
                reason: e.to_string(),
            });
        }

        match failure {
            Some(e) => Err(e),
            None => {
                info!("Runtime shutdown complete.");
                Ok(())
            }
        }
    }
}
