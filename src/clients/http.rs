use crate::framework::{Transport, TransportError, TransportRequest};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::debug;

/// [`Transport`] over HTTP, backed by `reqwest`.
///
/// Request uris are joined onto `origin`. Any status other than `200 OK` is a
/// failure, and a successful body must be JSON.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    origin: String,
}

impl HttpTransport {
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_client(Client::new(), origin)
    }

    pub fn with_client(client: Client, origin: impl Into<String>) -> Self {
        Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::Network(format!("invalid method {}: {e}", request.method)))?;
        let url = format!("{}{}", self.origin, request.uri);
        debug!(%method, %url, "HTTP request");

        let mut builder = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
