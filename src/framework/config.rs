//! # Endpoint Declarations
//!
//! The data an application writes to declare a remote call. An [`EndpointConfig`]
//! is compiled once into names, a command creator and (usually) a handler task,
//! and is then shared immutably behind an `Arc` for the lifetime of that task.
//!
//! Declarations can be written in code with the chained `with_*` setters or
//! loaded from JSON. JSON keys are camelCase; a few older spellings are accepted
//! as aliases (`message`, `redirect`, `customSaga`, `componentName`, and the
//! boolean `noBlock`).
//!
//! ```
//! use api_model::framework::{EndpointConfig, ConcurrencyMode};
//!
//! let from_code = EndpointConfig::new("/users/:id")
//!     .with_method("GET")
//!     .with_auto_loading(true)
//!     .with_concurrency(ConcurrencyMode::Concurrent);
//!
//! let from_json = EndpointConfig::from_value(&serde_json::json!({
//!     "path": "/users/:id",
//!     "method": "GET",
//!     "autoLoading": true,
//!     "concurrencyMode": "concurrent"
//! })).unwrap();
//!
//! assert_eq!(from_code.http_method(), from_json.http_method());
//! assert_eq!(from_code.concurrency_mode, from_json.concurrency_mode);
//! ```

use crate::framework::error::FrameworkError;
use crate::framework::names::normalize_method;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A path that is either fixed at declaration time or computed on every call.
///
/// The variant is chosen when the endpoint is declared and never inferred later.
#[derive(Clone)]
pub enum ApiPath {
    Static(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl ApiPath {
    pub fn dynamic(provider: impl Fn() -> String + Send + Sync + 'static) -> Self {
        ApiPath::Dynamic(Arc::new(provider))
    }

    /// Current value of the path.
    pub fn resolve(&self) -> String {
        match self {
            ApiPath::Static(path) => path.clone(),
            ApiPath::Dynamic(provider) => provider(),
        }
    }
}

impl Default for ApiPath {
    fn default() -> Self {
        ApiPath::Static(String::new())
    }
}

impl fmt::Debug for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiPath::Static(path) => f.debug_tuple("Static").field(path).finish(),
            ApiPath::Dynamic(_) => f.write_str("Dynamic(<provider>)"),
        }
    }
}

impl From<&str> for ApiPath {
    fn from(path: &str) -> Self {
        ApiPath::Static(path.to_string())
    }
}

impl From<String> for ApiPath {
    fn from(path: String) -> Self {
        ApiPath::Static(path)
    }
}

// Only the static form can come from data.
impl<'de> Deserialize<'de> for ApiPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ApiPath::Static)
    }
}

/// Flag name used when loading is switched on with a plain `true`.
pub const DEFAULT_LOADING_FLAG: &str = "loading";

/// `bool | flagName`, used by both `autoLoading` and `showLoading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoadingSwitch {
    Enabled(bool),
    Named(String),
}

impl LoadingSwitch {
    pub fn is_on(&self) -> bool {
        match self {
            LoadingSwitch::Enabled(on) => *on,
            LoadingSwitch::Named(name) => !name.is_empty(),
        }
    }

    /// The state key to toggle: the given name, or [`DEFAULT_LOADING_FLAG`].
    pub fn flag_name(&self) -> &str {
        match self {
            LoadingSwitch::Named(name) if !name.is_empty() => name,
            _ => DEFAULT_LOADING_FLAG,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            LoadingSwitch::Enabled(on) => Value::Bool(*on),
            LoadingSwitch::Named(name) => Value::String(name.clone()),
        }
    }

    /// Reads a switch back out of a command payload.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(on) => Some(LoadingSwitch::Enabled(*on)),
            Value::String(name) => Some(LoadingSwitch::Named(name.clone())),
            _ => None,
        }
    }
}

impl Default for LoadingSwitch {
    fn default() -> Self {
        LoadingSwitch::Enabled(false)
    }
}

impl From<bool> for LoadingSwitch {
    fn from(on: bool) -> Self {
        LoadingSwitch::Enabled(on)
    }
}

impl From<&str> for LoadingSwitch {
    fn from(name: &str) -> Self {
        LoadingSwitch::Named(name.to_string())
    }
}

/// `bool | text` shown after a successful call. Only text produces a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuccessNotice {
    Enabled(bool),
    Text(String),
}

impl SuccessNotice {
    pub fn text(&self) -> Option<&str> {
        match self {
            SuccessNotice::Text(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for SuccessNotice {
    fn from(text: &str) -> Self {
        SuccessNotice::Text(text.to_string())
    }
}

/// Navigation requested after a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    #[serde(alias = "componentName")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Redirect {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Where the payload goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    Query,
    Body,
}

/// How an endpoint task treats requests that arrive while one is in flight.
///
/// From data it reads either a name (`"serial"`, `"concurrent"`, `"noBlock"`) or
/// the older boolean form, where `true` means concurrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// One call at a time, outcomes in submission order.
    #[default]
    Serial,
    /// One detached execution per request.
    Concurrent,
}

impl<'de> Deserialize<'de> for ConcurrencyMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            NoBlock(bool),
            Named(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::NoBlock(true) => Ok(ConcurrencyMode::Concurrent),
            Raw::NoBlock(false) => Ok(ConcurrencyMode::Serial),
            Raw::Named(name) => match name.as_str() {
                "serial" => Ok(ConcurrencyMode::Serial),
                "concurrent" | "noBlock" => Ok(ConcurrencyMode::Concurrent),
                other => Err(de::Error::unknown_variant(
                    other,
                    &["serial", "concurrent", "noBlock"],
                )),
            },
        }
    }
}

/// Declaration of one remote call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub path: ApiPath,
    pub method: Option<String>,
    pub data_mode: Option<DataMode>,
    /// Overrides the model and global base path.
    pub base_path: Option<ApiPath>,
    pub auto_loading: Option<LoadingSwitch>,
    pub show_loading: Option<LoadingSwitch>,
    #[serde(alias = "message")]
    pub notify_on_success: Option<SuccessNotice>,
    #[serde(alias = "redirect")]
    pub navigate_on_success: Option<Redirect>,
    #[serde(default, alias = "concurrency", alias = "noBlock")]
    pub concurrency_mode: ConcurrencyMode,
    /// Compile names and creator only; the application brings its own handler.
    #[serde(default, alias = "customSaga")]
    pub custom_handler: bool,
    /// Derive command names under this model name instead of the owning model's.
    pub model_name: Option<String>,
    /// Extra transport options merged into the request descriptor.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl EndpointConfig {
    pub fn new(path: impl Into<ApiPath>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parses one JSON declaration.
    pub fn from_value(value: &Value) -> Result<Self, FrameworkError> {
        serde_json::from_value(value.clone()).map_err(|e| FrameworkError::InvalidConfig {
            section: "endpoint".to_string(),
            reason: e.to_string(),
        })
    }

    /// Normalized HTTP method (default `POST`).
    pub fn http_method(&self) -> String {
        normalize_method(self.method.as_deref())
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_data_mode(mut self, mode: DataMode) -> Self {
        self.data_mode = Some(mode);
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<ApiPath>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_auto_loading(mut self, switch: impl Into<LoadingSwitch>) -> Self {
        self.auto_loading = Some(switch.into());
        self
    }

    pub fn with_show_loading(mut self, switch: impl Into<LoadingSwitch>) -> Self {
        self.show_loading = Some(switch.into());
        self
    }

    pub fn with_notify_on_success(mut self, notice: impl Into<SuccessNotice>) -> Self {
        self.notify_on_success = Some(notice.into());
        self
    }

    pub fn with_navigate_on_success(mut self, redirect: Redirect) -> Self {
        self.navigate_on_success = Some(redirect);
        self
    }

    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    pub fn with_custom_handler(mut self) -> Self {
        self.custom_handler = true;
        self
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}
