//! Host bridge contract.
//!
//! The flag client never talks HTTP directly; it goes through a bridge that
//! knows how to reach this application's own backend endpoints and the
//! upstream project tracker on behalf of the current session.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

mod http;

pub use http::HttpHostBridge;

/// Query string pairs, sent in order.
pub type Query = Vec<(String, String)>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("bridge not configured: {0}")]
    Config(String),
}

/// A call against one of this application's backend endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub body: Option<Value>,
    pub query: Query,
}

impl BackendRequest {
    pub fn get() -> Self {
        Self { method: Method::GET, body: None, query: Vec::new() }
    }

    pub fn put(body: Value) -> Self {
        Self { method: Method::PUT, body: Some(body), query: Vec::new() }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Invoke a backend endpoint, e.g. `project-flags`.
    async fn call_backend(&self, path: &str, request: BackendRequest) -> Result<Value, BridgeError>;
    /// Invoke the upstream REST API, e.g. `admin/projects`.
    async fn call_upstream(&self, path: &str, query: Query) -> Result<Value, BridgeError>;
}
