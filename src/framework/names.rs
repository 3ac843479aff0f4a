//! # Name Registry
//!
//! Pure functions deriving the command types used by a model. Everything here is
//! deterministic: the same `(model, method, key)` always yields the same triple,
//! so two processes compiling the same declarations agree on every name.
//!
//! | What | Formula |
//! |---|---|
//! | endpoint base | `api-{model}-{METHOD}-{key}` |
//! | request / success / error | base + `_request` / `_success` / `_error` |
//! | resource sub-endpoint key | `{resource}-{verb}` |
//! | simple command | `{model}-{value}` |
//! | loading toggles | `{model}-startLoading`, `{model}-endLoading` |

use serde::{Deserialize, Serialize};

pub const API_PREFIX: &str = "api-";
pub const REQUEST_SUFFIX: &str = "_request";
pub const SUCCESS_SUFFIX: &str = "_success";
pub const ERROR_SUFFIX: &str = "_error";
pub const START_LOADING_SUFFIX: &str = "-startLoading";
pub const END_LOADING_SUFFIX: &str = "-endLoading";

/// Method used when an endpoint does not declare one.
pub const DEFAULT_METHOD: &str = "POST";

/// The three command types of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandNames {
    pub request: String,
    pub success: String,
    pub error: String,
}

impl CommandNames {
    /// Derives the triple for `key` inside `model_name`.
    ///
    /// `method` is normalized the same way the transport adapter does it, so a
    /// lower-case `"get"` and `"GET"` produce identical names.
    pub fn derive(model_name: &str, method: Option<&str>, key: &str) -> Self {
        let base = format!(
            "{API_PREFIX}{model_name}-{}-{key}",
            normalize_method(method)
        );
        Self {
            request: format!("{base}{REQUEST_SUFFIX}"),
            success: format!("{base}{SUCCESS_SUFFIX}"),
            error: format!("{base}{ERROR_SUFFIX}"),
        }
    }
}

/// Missing method means POST; anything else is upper-cased.
pub fn normalize_method(method: Option<&str>) -> String {
    match method {
        Some(m) if !m.trim().is_empty() => m.trim().to_uppercase(),
        _ => DEFAULT_METHOD.to_string(),
    }
}

/// Key of a resource sub-endpoint, e.g. `users-index`.
pub fn resource_endpoint_key(resource_key: &str, verb_suffix: &str) -> String {
    format!("{resource_key}-{verb_suffix}")
}

/// Type of a simple (task-less) command registration.
pub fn simple_command_name(model_name: &str, value: &str) -> String {
    format!("{model_name}-{value}")
}

/// The pair of loading toggle types owned by one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingCommandNames {
    pub start: String,
    pub end: String,
}

pub fn loading_command_names(model_name: &str) -> LoadingCommandNames {
    LoadingCommandNames {
        start: format!("{model_name}{START_LOADING_SUFFIX}"),
        end: format!("{model_name}{END_LOADING_SUFFIX}"),
    }
}

pub fn is_request_command(kind: &str) -> bool {
    kind.starts_with(API_PREFIX) && kind.ends_with(REQUEST_SUFFIX)
}

pub fn is_success_command(kind: &str) -> bool {
    kind.starts_with(API_PREFIX) && kind.ends_with(SUCCESS_SUFFIX)
}

pub fn is_error_command(kind: &str) -> bool {
    kind.starts_with(API_PREFIX) && kind.ends_with(ERROR_SUFFIX)
}

pub fn is_start_loading(kind: &str) -> bool {
    kind.ends_with(START_LOADING_SUFFIX)
}

pub fn is_end_loading(kind: &str) -> bool {
    kind.ends_with(END_LOADING_SUFFIX)
}
