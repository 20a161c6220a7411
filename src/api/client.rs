use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::{ChatRequest, HealthResponse, ModelsResponse, UserRecord};
use crate::utils::url::construct_api_url;

#[derive(Debug)]
pub enum BackendError {
    /// The request never produced an HTTP response.
    Network(reqwest::Error),

    /// The backend answered with a non-success status.
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not the JSON we expected.
    Decode(serde_json::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Network(err) => write!(f, "network error: {err}"),
            BackendError::Status { status, .. } => write!(f, "HTTP {}", status.as_u16()),
            BackendError::Decode(err) => write!(f, "malformed response: {err}"),
        }
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BackendError::Network(err) => Some(err),
            BackendError::Status { .. } => None,
            BackendError::Decode(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network(err)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err)
    }
}

/// The routing backend that talks to the hosted API and the local server.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Models exposed by the local server at `server_url`.
    async fn list_local_models(&self, server_url: &str) -> Result<Vec<String>, BackendError>;

    /// Send one chat message. The reply shape is backend specific.
    async fn send_chat(&self, request: &ChatRequest) -> Result<Value, BackendError>;

    async fn health(&self, server_url: &str) -> Result<HealthResponse, BackendError>;

    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        construct_api_url(&self.base_url, endpoint)
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.header("Accept", "application/json").send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            debug!(%status, body = %body, "backend request failed");
            return Err(BackendError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_local_models(&self, server_url: &str) -> Result<Vec<String>, BackendError> {
        let request = self
            .client
            .get(self.url("api/chat/ollama/models"))
            .query(&[("base_url", server_url)]);
        let response: ModelsResponse = self.read_json(request).await?;
        Ok(response.models)
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<Value, BackendError> {
        let builder = self
            .client
            .post(self.url("api/chat/chat"))
            .header("Content-Type", "application/json")
            .json(request);
        self.read_json(builder).await
    }

    async fn health(&self, server_url: &str) -> Result<HealthResponse, BackendError> {
        let request = self
            .client
            .get(self.url("api/chat/health"))
            .query(&[("ollama_url", server_url)]);
        self.read_json(request).await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        self.read_json(self.client.get(self.url("api/users"))).await
    }
}
