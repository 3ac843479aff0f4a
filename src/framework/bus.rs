//! # Command Bus
//!
//! The shared dispatch point every command passes through, and the minimal state
//! container that goes with it.
//!
//! ## Dispatch Order
//!
//! [`CommandBus::dispatch`] does three things, in this order:
//!
//! 1. Applies the command to every mounted state slice through that slice's
//!    state transition.
//! 2. Delivers the command to each subscriber queue registered for its type, and
//!    to every full-stream tap.
//! 3. Runs the middlewares.
//!
//! Steps 1 and 2 happen under one lock, so every observer sees commands in the
//! same order and a slice is already updated by the time any task or tap
//! receives the command that changed it. State transitions run under that lock
//! and must not dispatch. Middlewares run after it is released and may.
//!
//! ## Queues
//!
//! Each subscription is its own unbounded FIFO queue, so dispatching never
//! blocks and never awaits. Closing the bus drops every queue sender, which ends
//! the receive loops of all tasks.

use crate::framework::command::Command;
use crate::framework::middleware::Middleware;
use crate::framework::model::Reducer;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

struct Slice {
    state: Value,
    reducer: Option<Reducer>,
}

#[derive(Default)]
struct Core {
    slices: BTreeMap<String, Slice>,
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Command>>>,
    taps: Vec<mpsc::UnboundedSender<Command>>,
    closed: bool,
}

#[derive(Default)]
struct Inner {
    core: Mutex<Core>,
    middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
}

/// Cheap to clone; all clones share the same queues and state.
#[derive(Clone, Default)]
pub struct CommandBus {
    inner: Arc<Inner>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn core(&self) -> MutexGuard<'_, Core> {
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reduces, routes, then runs middlewares.
    pub fn dispatch(&self, command: Command) {
        {
            let mut core = self.core();
            if core.closed {
                debug!(kind = %command.kind, "Bus closed, command dropped");
                return;
            }
            trace!(kind = %command.kind, "Dispatch");

            for slice in core.slices.values_mut() {
                if let Some(reducer) = &slice.reducer {
                    reducer(&mut slice.state, &command);
                }
            }
            if let Some(senders) = core.subscribers.get_mut(&command.kind) {
                senders.retain(|sender| sender.send(command.clone()).is_ok());
            }
            core.taps.retain(|sender| sender.send(command.clone()).is_ok());
        }

        let middlewares = self
            .inner
            .middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for middleware in &middlewares {
            middleware.on_command(&command);
        }
    }

    /// A FIFO queue of every future command of type `kind`.
    ///
    /// On a closed bus the returned receiver yields `None` immediately.
    pub fn subscribe(&self, kind: &str) -> mpsc::UnboundedReceiver<Command> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut core = self.core();
        if !core.closed {
            core.subscribers
                .entry(kind.to_string())
                .or_default()
                .push(sender);
        }
        receiver
    }

    /// A FIFO queue of every future command, whatever its type.
    pub fn tap(&self) -> mpsc::UnboundedReceiver<Command> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut core = self.core();
        if !core.closed {
            core.taps.push(sender);
        }
        receiver
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.core()
            .subscribers
            .get(kind)
            .map_or(0, |senders| senders.iter().filter(|s| !s.is_closed()).count())
    }

    /// Registers a named state slice. Mounting the same name twice replaces the
    /// earlier slice.
    pub fn mount_slice(&self, name: &str, initial: Value, reducer: Option<Reducer>) {
        let mut core = self.core();
        let previous = core.slices.insert(
            name.to_string(),
            Slice {
                state: initial,
                reducer,
            },
        );
        if previous.is_some() {
            warn!(slice = name, "State slice replaced");
        }
    }

    /// Snapshot of one slice.
    pub fn state(&self, name: &str) -> Option<Value> {
        self.core().slices.get(name).map(|slice| slice.state.clone())
    }

    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.inner
            .middlewares
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(middleware);
    }

    /// Drops every queue. Further dispatches are ignored.
    pub fn close(&self) {
        let mut core = self.core();
        core.closed = true;
        core.subscribers.clear();
        core.taps.clear();
        debug!("Bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.core().closed
    }
}
