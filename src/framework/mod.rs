//! Declarative API endpoints compiled into commands and tasks.
//!
//! # Main Components
//!
//! - [`names`] - Deterministic command names for endpoints, resources and loading toggles
//! - [`config`] / [`resource`] - Endpoint and REST resource declarations
//! - [`transport`] - Request resolution and the [`Transport`] capability
//! - [`endpoint`] - One task per endpoint, serial or concurrent
//! - [`router`] - Turns finished requests into success / error commands
//! - [`model`] - Assembles everything a feature declares into a [`Model`]
//! - [`bus`] / [`middleware`] - Command dispatch, state slices and observers
//!
//! # Testing
//!
//! See [`mock`] for a scripted transport and a recording notifier.

pub mod bus;
pub mod command;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod loading;
pub mod middleware;
pub mod mock;
pub mod model;
pub mod names;
pub mod resource;
pub mod router;
pub mod settings;
pub mod task;
pub mod transport;

pub use bus::CommandBus;
pub use command::{Command, CommandCreator};
pub use config::{
    ApiPath, ConcurrencyMode, DataMode, EndpointConfig, LoadingSwitch, Redirect, SuccessNotice,
};
pub use endpoint::{compile_endpoint, CompileContext, CompiledEndpoint};
pub use error::FrameworkError;
pub use loading::{LoadingScope, LoadingToggle};
pub use middleware::{ApiErrorMiddleware, ApiSuccessMiddleware, Middleware, ShowLoadingMiddleware};
pub use model::{
    reducer_fn, CommandCreators, CommandNameTable, Handlers, Model, ModelBuilder, Reducer,
};
pub use names::CommandNames;
pub use resource::{
    compile_resource, CompiledResource, EndpointOverrides, ResourceConfig, RestMethods, RestVerb,
};
pub use router::{CompletionMessage, CompletionRouter, REDIRECT_COMMAND};
pub use settings::{Notifier, Settings, SettingsBuilder};
pub use task::{handle_every, task_fn, Task, TaskContext, TaskFuture};
pub use transport::{build_request, Transport, TransportError, TransportRequest};
