//! # Resource Generator
//!
//! Expands one resource declaration into the five conventional REST endpoints.
//!
//! | Verb | Method | Path | Key suffix |
//! |---|---|---|---|
//! | index | GET | `{path}` | `index` |
//! | show | GET | `{path}/:{id}` | `show` |
//! | create | POST | `{path}` | `create` |
//! | update | PUT | `{path}/:{id}` | `update` |
//! | destroy | DELETE | `{path}/:{id}` | `delete` |
//!
//! Each verb is compiled like any other endpoint and gets its own independent
//! task. The resource-level `autoLoading` / `showLoading` apply to every verb
//! unless the verb's own overrides say otherwise.
//!
//! The five-way tables serialize the destroy entry under the key `destory`,
//! which is the name existing consumers of the command tables look up.

use crate::framework::command::CommandCreator;
use crate::framework::config::{
    ApiPath, ConcurrencyMode, DataMode, EndpointConfig, LoadingSwitch, Redirect, SuccessNotice,
};
use crate::framework::endpoint::{compile_endpoint, CompileContext};
use crate::framework::error::FrameworkError;
use crate::framework::names::{resource_endpoint_key, CommandNames};
use crate::framework::task::Task;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The five conventional operations on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestVerb {
    Index,
    Show,
    Create,
    Update,
    Destroy,
}

impl RestVerb {
    pub const ALL: [RestVerb; 5] = [
        RestVerb::Index,
        RestVerb::Show,
        RestVerb::Create,
        RestVerb::Update,
        RestVerb::Destroy,
    ];

    pub fn method(self) -> &'static str {
        match self {
            RestVerb::Index | RestVerb::Show => "GET",
            RestVerb::Create => "POST",
            RestVerb::Update => "PUT",
            RestVerb::Destroy => "DELETE",
        }
    }

    /// Suffix of the sub-endpoint key.
    pub fn key_suffix(self) -> &'static str {
        match self {
            RestVerb::Index => "index",
            RestVerb::Show => "show",
            RestVerb::Create => "create",
            RestVerb::Update => "update",
            RestVerb::Destroy => "delete",
        }
    }

    /// Whether the path ends with the id placeholder.
    pub fn has_id(self) -> bool {
        matches!(self, RestVerb::Show | RestVerb::Update | RestVerb::Destroy)
    }
}

/// One value per verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestMethods<T> {
    pub index: T,
    pub show: T,
    pub create: T,
    pub update: T,
    #[serde(rename = "destory")]
    pub destroy: T,
}

impl<T> RestMethods<T> {
    pub fn from_fn(mut f: impl FnMut(RestVerb) -> T) -> Self {
        Self {
            index: f(RestVerb::Index),
            show: f(RestVerb::Show),
            create: f(RestVerb::Create),
            update: f(RestVerb::Update),
            destroy: f(RestVerb::Destroy),
        }
    }

    pub fn get(&self, verb: RestVerb) -> &T {
        match verb {
            RestVerb::Index => &self.index,
            RestVerb::Show => &self.show,
            RestVerb::Create => &self.create,
            RestVerb::Update => &self.update,
            RestVerb::Destroy => &self.destroy,
        }
    }
}

/// Per-verb settings layered over the resource defaults. Path and method are
/// fixed by the verb and cannot be overridden.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointOverrides {
    pub data_mode: Option<DataMode>,
    pub base_path: Option<ApiPath>,
    pub auto_loading: Option<LoadingSwitch>,
    pub show_loading: Option<LoadingSwitch>,
    #[serde(alias = "message")]
    pub notify_on_success: Option<SuccessNotice>,
    #[serde(alias = "redirect")]
    pub navigate_on_success: Option<Redirect>,
    #[serde(alias = "concurrency", alias = "noBlock")]
    pub concurrency_mode: Option<ConcurrencyMode>,
    #[serde(alias = "customSaga")]
    pub custom_handler: Option<bool>,
    pub model_name: Option<String>,
    pub options: Map<String, Value>,
}

fn default_id_key() -> String {
    "id".to_string()
}

/// Declaration of one REST resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    pub path: ApiPath,
    /// Name of the id path parameter.
    #[serde(default = "default_id_key")]
    pub id_key: String,
    pub auto_loading: Option<LoadingSwitch>,
    pub show_loading: Option<LoadingSwitch>,
    #[serde(default, alias = "indexConfig")]
    pub index: Option<EndpointOverrides>,
    #[serde(default, alias = "showConfig")]
    pub show: Option<EndpointOverrides>,
    #[serde(default, alias = "createConfig")]
    pub create: Option<EndpointOverrides>,
    #[serde(default, alias = "updateConfig")]
    pub update: Option<EndpointOverrides>,
    #[serde(default, alias = "destory", alias = "destoryConfig", alias = "destroyConfig")]
    pub destroy: Option<EndpointOverrides>,
}

macro_rules! verb_overrides {
    ($($verb:ident),*) => {
        paste::paste! {
            impl ResourceConfig {
                $(
                    #[doc = "Overrides for the `" $verb "` endpoint."]
                    pub fn [<with_ $verb>](mut self, overrides: EndpointOverrides) -> Self {
                        self.$verb = Some(overrides);
                        self
                    }
                )*
            }
        }
    };
}

verb_overrides!(index, show, create, update, destroy);

impl ResourceConfig {
    pub fn new(path: impl Into<ApiPath>) -> Self {
        Self {
            path: path.into(),
            id_key: default_id_key(),
            auto_loading: None,
            show_loading: None,
            index: None,
            show: None,
            create: None,
            update: None,
            destroy: None,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, FrameworkError> {
        serde_json::from_value(value.clone()).map_err(|e| FrameworkError::InvalidConfig {
            section: "resource".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
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

    fn overrides(&self, verb: RestVerb) -> Option<&EndpointOverrides> {
        match verb {
            RestVerb::Index => self.index.as_ref(),
            RestVerb::Show => self.show.as_ref(),
            RestVerb::Create => self.create.as_ref(),
            RestVerb::Update => self.update.as_ref(),
            RestVerb::Destroy => self.destroy.as_ref(),
        }
    }

    /// The endpoint declaration generated for `verb`.
    pub fn endpoint(&self, verb: RestVerb) -> EndpointConfig {
        let path = if verb.has_id() {
            let id_key = self.id_key.clone();
            match &self.path {
                ApiPath::Static(path) => ApiPath::Static(format!("{path}/:{id_key}")),
                ApiPath::Dynamic(provider) => {
                    let provider = provider.clone();
                    ApiPath::dynamic(move || format!("{}/:{id_key}", provider()))
                }
            }
        } else {
            self.path.clone()
        };

        let mut endpoint = EndpointConfig::new(path).with_method(verb.method());
        endpoint.auto_loading = self.auto_loading.clone();
        endpoint.show_loading = self.show_loading.clone();

        if let Some(o) = self.overrides(verb) {
            endpoint.data_mode = o.data_mode.or(endpoint.data_mode);
            endpoint.base_path = o.base_path.clone().or(endpoint.base_path);
            endpoint.auto_loading = o.auto_loading.clone().or(endpoint.auto_loading);
            endpoint.show_loading = o.show_loading.clone().or(endpoint.show_loading);
            endpoint.notify_on_success = o.notify_on_success.clone();
            endpoint.navigate_on_success = o.navigate_on_success.clone();
            endpoint.concurrency_mode = o.concurrency_mode.unwrap_or_default();
            endpoint.custom_handler = o.custom_handler.unwrap_or(false);
            endpoint.model_name = o.model_name.clone();
            endpoint.options = o.options.clone();
        }
        endpoint
    }
}

/// Output of [`compile_resource`].
pub struct CompiledResource {
    pub names: RestMethods<CommandNames>,
    pub creators: RestMethods<CommandCreator>,
    pub tasks: Vec<Box<dyn Task>>,
}

/// Compiles the five verbs of resource `key`.
pub fn compile_resource(key: &str, config: &ResourceConfig, ctx: &CompileContext) -> CompiledResource {
    let mut tasks = Vec::new();
    let compiled = RestMethods::from_fn(|verb| {
        let endpoint_key = resource_endpoint_key(key, verb.key_suffix());
        let mut compiled = compile_endpoint(&endpoint_key, config.endpoint(verb), ctx);
        tasks.extend(compiled.task.take());
        (compiled.names, compiled.creator)
    });

    CompiledResource {
        names: RestMethods::from_fn(|verb| compiled.get(verb).0.clone()),
        creators: RestMethods::from_fn(|verb| compiled.get(verb).1.clone()),
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockTransport;
    use crate::framework::settings::Settings;
    use serde_json::json;

    fn ctx() -> CompileContext {
        CompileContext::new("test", Settings::builder(MockTransport::new()).build())
    }

    #[test]
    fn test_five_verbs_with_conventional_names() {
        let compiled = compile_resource("users", &ResourceConfig::new("/users"), &ctx());

        assert_eq!(compiled.names.index.request, "api-test-GET-users-index_request");
        assert_eq!(compiled.names.show.request, "api-test-GET-users-show_request");
        assert_eq!(compiled.names.create.request, "api-test-POST-users-create_request");
        assert_eq!(compiled.names.update.request, "api-test-PUT-users-update_request");
        assert_eq!(compiled.names.destroy.request, "api-test-DELETE-users-delete_request");
        assert_eq!(compiled.tasks.len(), 5);
    }

    #[test]
    fn test_table_uses_destory_key() {
        let compiled = compile_resource("users", &ResourceConfig::new("/users"), &ctx());
        let table = serde_json::to_value(&compiled.names).unwrap();
        assert_eq!(
            table["destory"]["request"],
            json!("api-test-DELETE-users-delete_request")
        );
        assert!(table.get("destroy").is_none());
    }

    #[test]
    fn test_verb_paths_and_overrides() {
        let config = ResourceConfig::new("/users")
            .with_id_key("uid")
            .with_auto_loading(true)
            .with_update(EndpointOverrides {
                auto_loading: Some(false.into()),
                notify_on_success: Some("updated".into()),
                ..EndpointOverrides::default()
            })
            .with_destroy(EndpointOverrides {
                custom_handler: Some(true),
                ..EndpointOverrides::default()
            });

        assert_eq!(config.endpoint(RestVerb::Index).path.resolve(), "/users");
        let show = config.endpoint(RestVerb::Show);
        assert_eq!(show.path.resolve(), "/users/:uid");
        assert_eq!(show.auto_loading, Some(LoadingSwitch::from(true)));

        let update = config.endpoint(RestVerb::Update);
        assert_eq!(update.http_method(), "PUT");
        assert_eq!(update.auto_loading, Some(LoadingSwitch::from(false)));
        assert_eq!(update.notify_on_success.and_then(|n| n.text().map(str::to_string)).as_deref(), Some("updated"));

        let compiled = compile_resource("users", &config, &ctx());
        assert_eq!(compiled.tasks.len(), 4);
    }

    #[test]
    fn test_json_declaration_with_legacy_keys() {
        let config = ResourceConfig::from_value(&json!({
            "path": "/orders",
            "showLoading": true,
            "destoryConfig": { "message": "deleted" },
            "indexConfig": { "concurrency": "noBlock" }
        }))
        .unwrap();

        assert_eq!(config.id_key, "id");
        assert_eq!(
            config.endpoint(RestVerb::Index).concurrency_mode,
            ConcurrencyMode::Concurrent
        );
        let destroy = config.endpoint(RestVerb::Destroy);
        assert_eq!(destroy.show_loading, Some(LoadingSwitch::from(true)));
        assert!(destroy.notify_on_success.is_some());
    }

    #[test]
    fn test_dynamic_resource_path() {
        let config = ResourceConfig::new(ApiPath::dynamic(|| "/v2/users".to_string()));
        assert_eq!(config.endpoint(RestVerb::Destroy).path.resolve(), "/v2/users/:id");
    }
}
