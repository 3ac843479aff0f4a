//! Long-running handlers scheduled by the runtime.
//!
//! A [`Task`] is started exactly once. `start` runs synchronously on the
//! scheduling thread and must register every subscription it needs before
//! returning, so no command dispatched after mounting can be missed. The
//! returned future is then spawned on the tokio runtime.

use crate::framework::bus::CommandBus;
use crate::framework::command::Command;
use crate::framework::router::CompletionMessage;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handles a task uses to talk to the rest of the runtime.
#[derive(Clone)]
pub struct TaskContext {
    bus: CommandBus,
    completions: mpsc::UnboundedSender<CompletionMessage>,
}

impl TaskContext {
    pub fn new(bus: CommandBus, completions: mpsc::UnboundedSender<CompletionMessage>) -> Self {
        Self { bus, completions }
    }

    /// FIFO queue of every future command of type `kind`.
    pub fn take(&self, kind: &str) -> mpsc::UnboundedReceiver<Command> {
        self.bus.subscribe(kind)
    }

    pub fn put(&self, command: Command) {
        self.bus.dispatch(command);
    }

    /// Hands a finished request to the completion router.
    pub fn complete(&self, message: CompletionMessage) {
        if let Err(e) = self.completions.send(message) {
            warn!(request = %e.0.names.request, "Completion router gone, outcome dropped");
        }
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }
}

pub trait Task: Send {
    /// Identifies the task in logs and in collision checks.
    fn name(&self) -> &str;

    fn start(self: Box<Self>, ctx: TaskContext) -> TaskFuture;
}

struct EveryTask<F> {
    kind: String,
    handler: F,
}

impl<F, Fut> Task for EveryTask<F>
where
    F: Fn(Command, TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.kind
    }

    fn start(self: Box<Self>, ctx: TaskContext) -> TaskFuture {
        let EveryTask { kind, handler } = *self;
        let mut commands = ctx.take(&kind);
        Box::pin(async move {
            info!(kind, "Task started");
            while let Some(command) = commands.recv().await {
                handler(command, ctx.clone()).await;
            }
            debug!(kind, "Task stopped");
        })
    }
}

/// Runs `handler` for every command of type `kind`, one at a time, in order.
///
/// The usual way to give a `customHandler` endpoint its behavior.
pub fn handle_every<F, Fut>(kind: impl Into<String>, handler: F) -> Box<dyn Task>
where
    F: Fn(Command, TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(EveryTask {
        kind: kind.into(),
        handler,
    })
}

struct FnTask<F> {
    name: String,
    body: F,
}

impl<F> Task for FnTask<F>
where
    F: FnOnce(TaskContext) -> TaskFuture + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn start(self: Box<Self>, ctx: TaskContext) -> TaskFuture {
        (self.body)(ctx)
    }
}

/// A task from a closure. Subscriptions must be taken in the closure body, not
/// inside the future it returns.
pub fn task_fn<F>(name: impl Into<String>, body: F) -> Box<dyn Task>
where
    F: FnOnce(TaskContext) -> TaskFuture + Send + 'static,
{
    Box::new(FnTask {
        name: name.into(),
        body,
    })
}
