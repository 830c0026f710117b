/**
 * Mutation Transport
 *
 * HTTP side of optimistic writes. `MutationTransport` is the seam the
 * coordinator talks to; `HttpTransport` is the reqwest implementation.
 *
 * Mutation endpoints answer `{ "revert_key": ..., "version"?: ... }`.
 * Error responses carry `{ "error": ..., "status": ... }`; the `error`
 * string becomes the message of `ClientError::Rejected`.
 */

use crate::client::error::ClientError;
use crate::shared::revert::{normalize_path, MutationResponse, RevertKey, RevertRequest, RevertResponse};
use crate::shared::{AppConfig, ConfigError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};

#[async_trait(?Send)]
pub trait MutationTransport {
    /// Persist `body` at `path`.
    async fn write(&self, path: &str, body: &Map<String, Value>) -> Result<MutationResponse, ClientError>;

    /// Redeem `key` for the mutation at `path`.
    async fn revert(&self, path: &str, key: &RevertKey) -> Result<RevertResponse, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Transport for the configured `server_url`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config
            .server_url
            .as_deref()
            .map(Self::new)
            .ok_or(ConfigError::MissingValue("server_url"))
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, normalize_path(path))
    }

    async fn post<B, R>(&self, url: String, body: &B) -> Result<R, ClientError>
    where
        B: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            tracing::debug!("[Client] POST {} failed with {}: {}", url, status, message);
            return Err(ClientError::rejected(status.as_u16(), message));
        }

        Ok(response.json::<R>().await?)
    }
}

#[async_trait(?Send)]
impl MutationTransport for HttpTransport {
    async fn write(&self, path: &str, body: &Map<String, Value>) -> Result<MutationResponse, ClientError> {
        self.post(self.url(path), body).await
    }

    async fn revert(&self, path: &str, key: &RevertKey) -> Result<RevertResponse, ClientError> {
        let request = RevertRequest {
            revert_key: key.clone(),
        };
        self.post(self.url(&format!("revert/{}", normalize_path(path))), &request)
            .await
    }
}
