//! # Transport Adapter
//!
//! Turns an endpoint declaration plus a runtime payload into a concrete
//! [`TransportRequest`], and defines the [`Transport`] capability that performs
//! the actual call.
//!
//! ## Resolution Order
//!
//! 1. Resolve the endpoint path and the base path. The base path comes from the
//!    endpoint override, then the model override, then the global setting.
//! 2. Substitute every `/:name` segment of the path with the same-named payload
//!    key and remove that key from the payload. A missing key leaves the
//!    placeholder in place and logs a warning.
//! 3. Place the payload: explicit `dataMode` wins; otherwise `GET` sends a query
//!    string and every other method sends a JSON body.
//! 4. Merge caller options with method, headers and body.
//!
//! ```
//! use api_model::framework::{build_request, EndpointConfig, Settings, mock::MockTransport};
//! use serde_json::json;
//!
//! let settings = Settings::builder(MockTransport::new()).base_path("/api").build();
//! let endpoint = EndpointConfig::new("/users/:id").with_method("DELETE");
//!
//! let request = build_request(&endpoint, None, &settings, json!({ "id": 1, "force": true }));
//! assert_eq!(request.uri, "/api/users/1");
//! assert_eq!(request.body.as_deref(), Some(r#"{"force":true}"#));
//! ```

use crate::framework::config::{ApiPath, DataMode, EndpointConfig};
use crate::framework::settings::Settings;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Concrete request descriptor handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportRequest {
    pub uri: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    /// JSON text; `None` for query-mode requests and empty payloads.
    pub body: Option<String>,
    /// Caller-supplied options, passed through untouched.
    pub options: Map<String, Value>,
}

/// Failure of the transport capability itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("http status {status}, network error")]
    Status { status: u16 },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response body: {0}")]
    Decode(String),
    /// An arbitrary rejection value produced by a custom transport.
    #[error("Request rejected: {0}")]
    Rejected(Value),
}

impl TransportError {
    /// JSON form carried in error commands.
    pub fn to_value(&self) -> Value {
        match self {
            TransportError::Status { status } => json!({ "des": self.to_string(), "status": status }),
            TransportError::Network(_) | TransportError::Decode(_) => json!({ "des": self.to_string() }),
            TransportError::Rejected(value) => value.clone(),
        }
    }
}

/// The capability that performs a network call and resolves with parsed data.
///
/// Implementations must report failures as `Err` values. The framework never
/// retries a call and never times it out.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError>;
}

/// Resolves `endpoint` and `data` into a request descriptor.
///
/// `model_base_path` is the owning model's override, if any.
pub fn build_request(
    endpoint: &EndpointConfig,
    model_base_path: Option<&ApiPath>,
    settings: &Settings,
    data: Value,
) -> TransportRequest {
    let path = endpoint.path.resolve();
    let base_path = endpoint
        .base_path
        .as_ref()
        .or(model_base_path)
        .unwrap_or_else(|| settings.base_path())
        .resolve();
    let method = endpoint.http_method();

    let mut data = match data {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let path = match data.as_object_mut() {
        Some(fields) => substitute_path_params(&path, fields),
        None => path,
    };
    let mut uri = format!("{base_path}{path}");

    let use_query = match endpoint.data_mode {
        Some(mode) => mode == DataMode::Query,
        None => method == "GET",
    };

    let body = if use_query {
        match &data {
            Value::Object(fields) => {
                let query = query_string(fields);
                if !query.is_empty() {
                    uri.push('?');
                    uri.push_str(&query);
                }
            }
            other => debug!(uri = %uri, payload = %other, "Non-object payload dropped from query"),
        }
        None
    } else {
        json_body(&data)
    };

    TransportRequest {
        uri,
        method,
        headers: settings.headers(),
        body,
        options: endpoint.options.clone(),
    }
}

/// Replaces each `/:name` segment with the payload value under `name` and removes
/// the consumed keys from `fields`.
pub fn substitute_path_params(path: &str, fields: &mut Map<String, Value>) -> String {
    let mut resolved = String::with_capacity(path.len());
    let mut consumed = Vec::new();
    let mut rest = path;

    while let Some(pos) = rest.find("/:") {
        resolved.push_str(&rest[..=pos]);
        let after = &rest[pos + 2..];
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..end];

        if name.is_empty() {
            resolved.push(':');
        } else {
            match fields.get(name).and_then(path_segment) {
                Some(segment) => {
                    resolved.push_str(&segment);
                    consumed.push(name.to_string());
                }
                None => {
                    warn!(path, param = name, "Missing path parameter, placeholder left in uri");
                    resolved.push(':');
                    resolved.push_str(name);
                }
            }
        }
        rest = &after[end..];
    }
    resolved.push_str(rest);

    for name in consumed {
        fields.remove(&name);
    }
    resolved
}

/// `key=value` pairs joined by `&`. Null values are skipped; nothing is encoded.
pub fn query_string(fields: &Map<String, Value>) -> String {
    fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| format!("{key}={}", plain_text(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn json_body(data: &Value) -> Option<String> {
    match data {
        Value::Null => None,
        Value::Object(fields) if fields.is_empty() => None,
        other => serde_json::to_string(other).ok(),
    }
}

fn path_segment(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(plain_text(other)),
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockTransport;
    use std::sync::Arc;

    fn settings() -> Arc<Settings> {
        Settings::builder(MockTransport::new())
            .base_path("/api")
            .headers(|| BTreeMap::from([("X-Token".to_string(), "abc".to_string())]))
            .build()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(fields) => fields,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_substitutes_every_placeholder() {
        let mut fields = object(json!({ "org": "acme", "id": 7, "name": "x" }));
        let path = substitute_path_params("/orgs/:org/users/:id", &mut fields);
        assert_eq!(path, "/orgs/acme/users/7");
        assert_eq!(Value::Object(fields), json!({ "name": "x" }));
    }

    #[test]
    fn test_missing_param_leaves_placeholder() {
        let mut fields = object(json!({ "id": null, "name": "x" }));
        let path = substitute_path_params("/users/:id/edit", &mut fields);
        assert_eq!(path, "/users/:id/edit");
        assert!(fields.contains_key("id"));
    }

    #[test]
    fn test_repeated_placeholder_uses_same_value() {
        let mut fields = object(json!({ "id": 3 }));
        let path = substitute_path_params("/a/:id/b/:id", &mut fields);
        assert_eq!(path, "/a/3/b/3");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_get_goes_to_query_string() {
        let endpoint = EndpointConfig::new("/users").with_method("get");
        let request = build_request(
            &endpoint,
            None,
            &settings(),
            json!({ "page": 2, "q": "a b", "skip": null }),
        );
        assert_eq!(request.method, "GET");
        assert_eq!(request.uri, "/api/users?page=2&q=a b");
        assert_eq!(request.body, None);
        assert_eq!(request.headers.get("X-Token").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_explicit_data_mode_wins() {
        let endpoint = EndpointConfig::new("/search")
            .with_method("GET")
            .with_data_mode(DataMode::Body);
        let request = build_request(&endpoint, None, &settings(), json!({ "q": "x" }));
        assert_eq!(request.uri, "/api/search");
        assert_eq!(request.body.as_deref(), Some(r#"{"q":"x"}"#));

        let endpoint = EndpointConfig::new("/search").with_data_mode(DataMode::Query);
        let request = build_request(&endpoint, None, &settings(), json!({ "q": "x" }));
        assert_eq!(request.method, "POST");
        assert_eq!(request.uri, "/api/search?q=x");
    }

    #[test]
    fn test_empty_payload_has_no_body() {
        let endpoint = EndpointConfig::new("/ping");
        let request = build_request(&endpoint, None, &settings(), Value::Null);
        assert_eq!(request.body, None);
        let request = build_request(&endpoint, None, &settings(), json!({}));
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_base_path_precedence() {
        let settings = settings();
        let model_base = ApiPath::from("/model");

        let plain = EndpointConfig::new("/a");
        assert_eq!(build_request(&plain, None, &settings, Value::Null).uri, "/api/a");
        assert_eq!(
            build_request(&plain, Some(&model_base), &settings, Value::Null).uri,
            "/model/a"
        );

        let overridden = EndpointConfig::new("/a").with_base_path(ApiPath::dynamic(|| "/own".into()));
        assert_eq!(
            build_request(&overridden, Some(&model_base), &settings, Value::Null).uri,
            "/own/a"
        );
    }

    #[test]
    fn test_options_pass_through() {
        let endpoint = EndpointConfig::new("/a").with_option("credentials", json!("include"));
        let request = build_request(&endpoint, None, &settings(), Value::Null);
        assert_eq!(request.options.get("credentials"), Some(&json!("include")));
    }

    #[test]
    fn test_transport_error_values() {
        assert_eq!(
            TransportError::Status { status: 500 }.to_value(),
            json!({ "des": "http status 500, network error", "status": 500 })
        );
        assert_eq!(
            TransportError::Rejected(json!({ "code": 1 })).to_value(),
            json!({ "code": 1 })
        );
    }
}
