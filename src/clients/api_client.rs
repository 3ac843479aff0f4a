use crate::framework::{
    build_request, CommandNames, CompletionMessage, EndpointConfig, Settings, TransportError,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Model name used for the command names a one-shot call reports to the
/// classifier, when the endpoint does not set its own.
pub const CLIENT_MODEL_NAME: &str = "client";

/// Errors of a one-shot request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Request classified as failed: {0}")]
    Classified(Value),
}

impl ApiError {
    /// JSON form, the same value an error command would carry.
    pub fn to_value(&self) -> Value {
        match self {
            ApiError::Transport(e) => e.to_value(),
            ApiError::Classified(value) => value.clone(),
        }
    }
}

/// Calls an endpoint directly, bypassing commands, tasks and loading flags.
///
/// The request is resolved exactly as an endpoint task would resolve it, and the
/// response goes through the same classifier and post-processor. The classifier
/// receives a [`CompletionMessage`] whose names are derived under the endpoint's
/// `modelName` (or [`CLIENT_MODEL_NAME`]) with the resolved path as key.
#[derive(Clone, Debug)]
pub struct ApiClient {
    settings: Arc<Settings>,
}

impl ApiClient {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    #[instrument(skip(self, endpoint, data), fields(path = %endpoint.path.resolve()))]
    pub async fn request(&self, endpoint: &EndpointConfig, data: Value) -> Result<Value, ApiError> {
        debug!(%data, "request called");
        let descriptor = build_request(endpoint, None, &self.settings, data.clone());
        let response = self.settings.transport().send(descriptor).await?;

        let model_name = endpoint.model_name.as_deref().unwrap_or(CLIENT_MODEL_NAME);
        let message = CompletionMessage {
            names: CommandNames::derive(model_name, endpoint.method.as_deref(), &endpoint.path.resolve()),
            request: data,
            outcome: Ok(response),
            except: Value::Object(Map::new()),
            endpoint: Arc::new(endpoint.clone()),
        };
        if let Some(error) = self.settings.classify(&message) {
            warn!(%error, "Response classified as error");
            return Err(ApiError::Classified(error));
        }
        let response = message.outcome.unwrap_or(Value::Null);
        Ok(self.settings.process_response(response))
    }
}
