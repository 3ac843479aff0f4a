//! # Model Assembler
//!
//! A [`Model`] bundles everything one feature of the application declares:
//! simple commands, API endpoints, REST resources, the state transition of its
//! state slice, and the tasks that serve its endpoints.
//!
//! ```
//! use api_model::framework::{reducer_fn, EndpointConfig, ModelBuilder, Settings, mock::MockTransport};
//! use serde_json::json;
//!
//! let settings = Settings::builder(MockTransport::new()).build();
//! let model = ModelBuilder::new("test")
//!     .simple("add", "add")
//!     .api("getAge", EndpointConfig::new("/age").with_method("GET"))
//!     .initial_state(json!({ "age": 0 }))
//!     .reducer(|names| {
//!         let add = names.simple["add"].clone();
//!         reducer_fn(move |state, command| {
//!             if command.kind == add {
//!                 state["age"] = json!(state["age"].as_i64().unwrap_or(0) + 1);
//!             }
//!         })
//!     })
//!     .build(&settings);
//!
//! assert_eq!(model.names.api["getAge"].request, "api-test-GET-getAge_request");
//! assert_eq!(model.creators.simple["add"].call().kind, "test-add");
//! ```
//!
//! ## Loading Flags
//!
//! The state transition of every model is wrapped: this model's own loading
//! toggles that carry a `flagName` set `state[flagName]` to `true` / `false`
//! directly. Every other command falls through to the supplied transition.
//!
//! ## Task Order
//!
//! Tasks from [`ModelBuilder::tasks`] come first, then endpoint tasks in
//! registration order, then resource tasks.

use crate::framework::command::{Command, CommandCreator};
use crate::framework::config::{ApiPath, EndpointConfig};
use crate::framework::endpoint::{compile_endpoint, CompileContext};
use crate::framework::names::{loading_command_names, simple_command_name, CommandNames};
use crate::framework::resource::{compile_resource, ResourceConfig, RestMethods};
use crate::framework::settings::Settings;
use crate::framework::task::Task;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A state transition. Runs under the bus lock and must not dispatch.
pub type Reducer = Arc<dyn Fn(&mut Value, &Command) + Send + Sync>;

/// Wraps a closure as a [`Reducer`].
pub fn reducer_fn(f: impl Fn(&mut Value, &Command) + Send + Sync + 'static) -> Reducer {
    Arc::new(f)
}

/// Maps command types to state transitions. Unknown types leave the state alone.
#[derive(Clone, Default)]
pub struct Handlers {
    handlers: HashMap<String, Reducer>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        mut self,
        kind: impl Into<String>,
        handler: impl Fn(&mut Value, &Command) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(kind.into(), Arc::new(handler));
        self
    }

    pub fn into_reducer(self) -> Reducer {
        Arc::new(move |state: &mut Value, command: &Command| {
            if let Some(handler) = self.handlers.get(&command.kind) {
                handler(state, command);
            }
        })
    }
}

/// Every command type a model defines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandNameTable {
    pub simple: BTreeMap<String, String>,
    pub api: BTreeMap<String, CommandNames>,
    #[serde(rename = "restApi")]
    pub rest: BTreeMap<String, RestMethods<CommandNames>>,
}

/// One creator per request type and simple command.
#[derive(Debug, Clone, Default)]
pub struct CommandCreators {
    pub simple: BTreeMap<String, CommandCreator>,
    pub api: BTreeMap<String, CommandCreator>,
    pub rest: BTreeMap<String, RestMethods<CommandCreator>>,
}

pub struct Model {
    pub name: String,
    pub names: CommandNameTable,
    pub creators: CommandCreators,
    pub initial_state: Value,
    reducer: Reducer,
    tasks: Vec<Box<dyn Task>>,
}

impl Model {
    pub fn reducer(&self) -> Reducer {
        self.reducer.clone()
    }

    pub fn reduce(&self, state: &mut Value, command: &Command) {
        (self.reducer)(state, command);
    }

    /// Names of the tasks not yet handed out.
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    /// Moves the tasks out. A second call returns nothing, so a model's tasks
    /// can only ever be started once.
    pub fn take_tasks(&mut self) -> Vec<Box<dyn Task>> {
        std::mem::take(&mut self.tasks)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("names", &self.names)
            .field("initial_state", &self.initial_state)
            .field("tasks", &self.task_names())
            .finish()
    }
}

type ReducerFactory = Box<dyn FnOnce(&CommandNameTable) -> Reducer + Send>;
type TaskFactory = Box<dyn FnOnce(&Model) -> Vec<Box<dyn Task>> + Send>;

/// Collects declarations, then compiles them into a [`Model`].
pub struct ModelBuilder {
    name: String,
    simple: Vec<(String, String)>,
    api: Vec<(String, EndpointConfig)>,
    rest: Vec<(String, ResourceConfig)>,
    base_path: Option<ApiPath>,
    initial_state: Value,
    reducer: Option<ReducerFactory>,
    tasks: Option<TaskFactory>,
}

fn upsert<T>(entries: &mut Vec<(String, T)>, model: &str, section: &str, key: String, value: T) {
    match entries.iter_mut().find(|(existing, _)| *existing == key) {
        Some(entry) => {
            warn!(model, section, key = %key, "Duplicate key, earlier registration replaced");
            entry.1 = value;
        }
        None => entries.push((key, value)),
    }
}

/// Iterates a JSON registration set, warning and skipping when it is not an object.
fn object_entries<'a>(
    model: &str,
    section: &str,
    set: &'a Value,
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    let fields = set.as_object();
    if fields.is_none() {
        warn!(model, section, "Registration set is not an object, skipped");
    }
    fields.into_iter().flat_map(Map::iter)
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            simple: Vec::new(),
            api: Vec::new(),
            rest: Vec::new(),
            base_path: None,
            initial_state: Value::Object(Map::new()),
            reducer: None,
            tasks: None,
        }
    }

    /// Registers the simple command `{model}-{value}` under `key`.
    pub fn simple(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.simple, &self.name, "simple", key.into(), value.into());
        self
    }

    /// Registers every `key: value` pair of a JSON object as a simple command.
    pub fn simple_set(mut self, set: &Value) -> Self {
        for (key, value) in object_entries(&self.name, "simple", set) {
            match value.as_str() {
                Some(value) => {
                    upsert(&mut self.simple, &self.name, "simple", key.clone(), value.to_string())
                }
                None => warn!(model = %self.name, key = %key, "Simple command value is not a string, skipped"),
            }
        }
        self
    }

    pub fn api(mut self, key: impl Into<String>, config: EndpointConfig) -> Self {
        upsert(&mut self.api, &self.name, "api", key.into(), config);
        self
    }

    /// Registers every entry of a JSON object as an endpoint. Entries that do not
    /// parse are logged and skipped.
    pub fn api_set(mut self, set: &Value) -> Self {
        for (key, value) in object_entries(&self.name, "api", set) {
            match EndpointConfig::from_value(value) {
                Ok(config) => upsert(&mut self.api, &self.name, "api", key.clone(), config),
                Err(e) => warn!(model = %self.name, key = %key, error = %e, "Endpoint skipped"),
            }
        }
        self
    }

    pub fn rest(mut self, key: impl Into<String>, config: ResourceConfig) -> Self {
        upsert(&mut self.rest, &self.name, "rest", key.into(), config);
        self
    }

    pub fn rest_set(mut self, set: &Value) -> Self {
        for (key, value) in object_entries(&self.name, "rest", set) {
            match ResourceConfig::from_value(value) {
                Ok(config) => upsert(&mut self.rest, &self.name, "rest", key.clone(), config),
                Err(e) => warn!(model = %self.name, key = %key, error = %e, "Resource skipped"),
            }
        }
        self
    }

    /// Base path for every endpoint of this model that does not set its own.
    pub fn base_path(mut self, base_path: impl Into<ApiPath>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn initial_state(mut self, state: Value) -> Self {
        self.initial_state = state;
        self
    }

    /// The state transition, built from the finished name table.
    pub fn reducer(
        mut self,
        factory: impl FnOnce(&CommandNameTable) -> Reducer + Send + 'static,
    ) -> Self {
        self.reducer = Some(Box::new(factory));
        self
    }

    /// Application tasks, computed from the assembled model and scheduled before
    /// the generated ones.
    pub fn tasks(
        mut self,
        factory: impl FnOnce(&Model) -> Vec<Box<dyn Task>> + Send + 'static,
    ) -> Self {
        self.tasks = Some(Box::new(factory));
        self
    }

    pub fn build(self, settings: &Arc<Settings>) -> Model {
        let ModelBuilder {
            name,
            simple,
            api,
            rest,
            base_path,
            initial_state,
            reducer,
            tasks: task_factory,
        } = self;
        let ctx = CompileContext::new(name.clone(), settings.clone()).with_base_path(base_path);

        let mut names = CommandNameTable::default();
        let mut creators = CommandCreators::default();
        let mut tasks: Vec<Box<dyn Task>> = Vec::new();

        for (key, value) in simple {
            let kind = simple_command_name(&name, &value);
            creators.simple.insert(key.clone(), CommandCreator::new(kind.clone()));
            names.simple.insert(key, kind);
        }

        for (key, config) in api {
            let compiled = compile_endpoint(&key, config, &ctx);
            if let Some(task) = compiled.task {
                push_task(&mut tasks, &name, task);
            }
            creators.api.insert(key.clone(), compiled.creator);
            names.api.insert(key, compiled.names);
        }

        for (key, config) in rest {
            let compiled = compile_resource(&key, &config, &ctx);
            for task in compiled.tasks {
                push_task(&mut tasks, &name, task);
            }
            creators.rest.insert(key.clone(), compiled.creators);
            names.rest.insert(key, compiled.names);
        }

        let inner = reducer.map(|factory| factory(&names));
        let mut model = Model {
            reducer: with_loading_flags(&name, inner),
            name,
            names,
            creators,
            initial_state,
            tasks: Vec::new(),
        };

        let mut all_tasks = match task_factory {
            Some(factory) => factory(&model),
            None => Vec::new(),
        };
        all_tasks.extend(tasks);
        model.tasks = all_tasks;

        info!(
            model = %model.name,
            api = model.names.api.len(),
            rest = model.names.rest.len(),
            tasks = model.tasks.len(),
            "Model built"
        );
        model
    }
}

fn push_task(tasks: &mut Vec<Box<dyn Task>>, model: &str, task: Box<dyn Task>) {
    match tasks.iter().position(|existing| existing.name() == task.name()) {
        Some(index) => {
            warn!(model, request = task.name(), "Command name collision, earlier endpoint replaced");
            tasks[index] = task;
        }
        None => tasks.push(task),
    }
}

fn with_loading_flags(model_name: &str, inner: Option<Reducer>) -> Reducer {
    let loading = loading_command_names(model_name);
    Arc::new(move |state: &mut Value, command: &Command| {
        let on = if command.kind == loading.start {
            Some(true)
        } else if command.kind == loading.end {
            Some(false)
        } else {
            None
        };
        if let Some(on) = on {
            if let Some(flag) = command.payload.get("flagName").and_then(Value::as_str) {
                if !state.is_object() {
                    *state = Value::Object(Map::new());
                }
                debug!(flag, on, "Loading flag");
                state[flag] = Value::Bool(on);
                return;
            }
        }
        if let Some(inner) = &inner {
            inner(state, command);
        }
    })
}
