use std::time::Duration;

use async_trait::async_trait;
use configs::ClientConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use super::{BackendRequest, BridgeError, HostBridge, Query};

/// Host bridge over plain HTTP.
///
/// Backend paths resolve under `{backend}/backend/`, upstream paths under
/// `{upstream}/api/` with an optional bearer token.
#[derive(Clone)]
pub struct HttpHostBridge {
    client: Client,
    backend_base_url: String,
    upstream_base_url: String,
    upstream_token: Option<String>,
}

impl HttpHostBridge {
    pub fn new(backend_base_url: impl Into<String>) -> Result<Self, BridgeError> {
        Self::from_config(&ClientConfig { backend_base_url: backend_base_url.into(), ..ClientConfig::default() })
    }

    pub fn from_config(cfg: &ClientConfig) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        Ok(Self {
            client,
            backend_base_url: cfg.backend_base_url.trim_end_matches('/').to_string(),
            upstream_base_url: cfg.upstream_base_url.trim_end_matches('/').to_string(),
            upstream_token: cfg.upstream_token.clone(),
        })
    }

    pub fn with_upstream(mut self, base_url: impl Into<String>, token: Option<String>) -> Self {
        self.upstream_base_url = base_url.into().trim_end_matches('/').to_string();
        self.upstream_token = token;
        self
    }

    async fn send(builder: RequestBuilder) -> Result<Value, BridgeError> {
        let resp = builder.send().await.map_err(|e| BridgeError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;
        resp.json::<Value>().await.map_err(|e| BridgeError::Decode(e.to_string()))
    }
}

/// Non-2xx becomes `BridgeError::Http`, carrying the body's `error` field
/// when the server sent one.
async fn check_status(resp: Response) -> Result<Response, BridgeError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(BridgeError::Http { status: status.as_u16(), message })
}

#[async_trait]
impl HostBridge for HttpHostBridge {
    async fn call_backend(&self, path: &str, request: BackendRequest) -> Result<Value, BridgeError> {
        let url = format!("{}/backend/{}", self.backend_base_url, path.trim_start_matches('/'));
        debug!(method = %request.method, %url, "backend call");
        let mut builder = self.client.request(request.method, url).query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Self::send(builder).await
    }

    async fn call_upstream(&self, path: &str, query: Query) -> Result<Value, BridgeError> {
        if self.upstream_base_url.is_empty() {
            return Err(BridgeError::Config("upstream base url not set".into()));
        }
        let url = format!("{}/api/{}", self.upstream_base_url, path.trim_start_matches('/'));
        debug!(%url, "upstream call");
        let mut builder = self
            .client
            .get(url)
            .query(&query)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.upstream_token {
            builder = builder.bearer_auth(token);
        }
        Self::send(builder).await
    }
}
