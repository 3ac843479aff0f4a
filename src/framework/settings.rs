//! # Settings
//!
//! The configuration shared by every model, the completion router and the
//! one-shot client. It is built once at startup and handed around as
//! `Arc<Settings>`; nothing in the crate reads process-wide state.
//!
//! ```
//! use api_model::framework::{Settings, mock::MockTransport};
//! use std::collections::BTreeMap;
//!
//! let settings = Settings::builder(MockTransport::new())
//!     .base_path("/api")
//!     .auto_loading("loading")
//!     .headers(|| BTreeMap::from([("Authorization".to_string(), "Bearer t".to_string())]))
//!     .error_classifier(|done| {
//!         let res = done.response()?;
//!         (res["code"] != 200).then(|| serde_json::json!({ "code": res["code"] }))
//!     })
//!     .build();
//!
//! assert_eq!(settings.base_path().resolve(), "/api");
//! ```

use crate::framework::config::{ApiPath, LoadingSwitch};
use crate::framework::router::CompletionMessage;
use crate::framework::transport::Transport;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type HeaderProvider = Arc<dyn Fn() -> BTreeMap<String, String> + Send + Sync>;

/// Inspects a request that completed without a transport error and returns an
/// application-level error, if its response encodes one.
///
/// It sees the whole [`CompletionMessage`]: request payload, command names,
/// endpoint and response. `None` and `Some(Value::Null)` both mean success.
pub type ErrorClassifier = Arc<dyn Fn(&CompletionMessage) -> Option<Value> + Send + Sync>;

/// Post-processes a successful response before it is put in the success command.
pub type ResponseProcessor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// The user-visible notification surface.
pub trait Notifier: Send + Sync {
    fn success(&self, text: &str);
}

/// Configuration constructed once and passed by reference.
#[derive(Clone)]
pub struct Settings {
    transport: Arc<dyn Transport>,
    base_path: ApiPath,
    headers: HeaderProvider,
    classifier: Option<ErrorClassifier>,
    processor: ResponseProcessor,
    auto_loading: LoadingSwitch,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Settings {
    pub fn builder(transport: impl Transport + 'static) -> SettingsBuilder {
        SettingsBuilder::new(Arc::new(transport))
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn base_path(&self) -> &ApiPath {
        &self.base_path
    }

    pub fn headers(&self) -> BTreeMap<String, String> {
        (self.headers)()
    }

    pub fn auto_loading(&self) -> &LoadingSwitch {
        &self.auto_loading
    }

    pub fn notifier(&self) -> Option<&Arc<dyn Notifier>> {
        self.notifier.as_ref()
    }

    /// Error verdict for a completed request.
    ///
    /// A transport failure is always an error and the classifier is not asked.
    /// Otherwise the classifier decides; a null verdict counts as success.
    pub fn classify(&self, message: &CompletionMessage) -> Option<Value> {
        if let Err(e) = &message.outcome {
            return Some(e.to_value());
        }
        self.classifier
            .as_ref()
            .and_then(|classify| classify(message))
            .filter(|error| !error.is_null())
    }

    pub fn process_response(&self, response: Value) -> Value {
        (self.processor)(response)
    }

    pub fn notify(&self, text: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.success(text);
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_path", &self.base_path)
            .field("auto_loading", &self.auto_loading)
            .field("classifier", &self.classifier.is_some())
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

/// Chained construction of [`Settings`].
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            settings: Settings {
                transport,
                base_path: ApiPath::default(),
                headers: Arc::new(BTreeMap::<String, String>::new),
                classifier: None,
                processor: Arc::new(|response: Value| response),
                auto_loading: LoadingSwitch::default(),
                notifier: None,
            },
        }
    }

    pub fn base_path(mut self, base_path: impl Into<ApiPath>) -> Self {
        self.settings.base_path = base_path.into();
        self
    }

    pub fn headers(
        mut self,
        provider: impl Fn() -> BTreeMap<String, String> + Send + Sync + 'static,
    ) -> Self {
        self.settings.headers = Arc::new(provider);
        self
    }

    pub fn error_classifier(
        mut self,
        classifier: impl Fn(&CompletionMessage) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.settings.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn process_response(
        mut self,
        processor: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.settings.processor = Arc::new(processor);
        self
    }

    /// Global default for endpoints that do not set `autoLoading`.
    pub fn auto_loading(mut self, switch: impl Into<LoadingSwitch>) -> Self {
        self.settings.auto_loading = switch.into();
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.settings.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn build(self) -> Arc<Settings> {
        Arc::new(self.settings)
    }
}
