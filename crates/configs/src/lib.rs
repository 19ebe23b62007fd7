use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Which key-value store backs the flag slot.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: StoreBackend::File, path: default_store_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

/// Settings for the host bridge used by the flag sync client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_backend_url")]
    pub backend_base_url: String,
    #[serde(default)]
    pub upstream_base_url: String,
    #[serde(default)]
    pub upstream_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_project_limit")]
    pub project_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_base_url: default_backend_url(),
            upstream_base_url: String::new(),
            upstream_token: None,
            timeout_secs: default_timeout(),
            project_limit: default_project_limit(),
        }
    }
}

fn default_store_path() -> PathBuf { PathBuf::from("data/kv.json") }
fn default_log_format() -> String { "compact".to_string() }
fn default_backend_url() -> String { "http://127.0.0.1:8080".to_string() }
fn default_timeout() -> u64 { 10 }
fn default_project_limit() -> u32 { 20 }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Config file when present, otherwise defaults overlaid with env vars.
    pub fn load_or_env() -> Result<Self> {
        Self::load_or_env_at(&config_path())
    }

    /// Only a missing file falls back to env vars; a file that exists but
    /// cannot be read or parsed is an error.
    pub fn load_or_env_at(path: &str) -> Result<Self> {
        let mut cfg = match std::fs::read_to_string(path) {
            Ok(content) => parse(&content).map_err(|e| anyhow!("invalid config {path}: {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::from_env(),
            Err(e) => return Err(anyhow!("cannot read config {path}: {e}")),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        cfg.server.worker_threads = std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok());
        cfg
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.store.normalize_from_env();
        self.store.validate()?;
        self.client.normalize_from_env();
        self.client.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StoreConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(path) = std::env::var("KV_STORE_PATH") {
            if !path.trim().is_empty() {
                self.path = PathBuf::from(path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == StoreBackend::File && self.path.as_os_str().is_empty() {
            return Err(anyhow!("store.path is empty; set it in config.toml or KV_STORE_PATH"));
        }
        Ok(())
    }
}

impl ClientConfig {
    pub fn normalize_from_env(&mut self) {
        if self.upstream_token.is_none() {
            self.upstream_token = std::env::var("UPSTREAM_TOKEN").ok().filter(|t| !t.trim().is_empty());
        }
        if self.upstream_base_url.trim().is_empty() {
            if let Ok(url) = std::env::var("UPSTREAM_BASE_URL") {
                self.upstream_base_url = url;
            }
        }
        let trimmed = self.backend_base_url.trim_end_matches('/').len();
        self.backend_base_url.truncate(trimmed);
        let trimmed = self.upstream_base_url.trim_end_matches('/').len();
        self.upstream_base_url.truncate(trimmed);
    }

    pub fn validate(&self) -> Result<()> {
        let lower = self.backend_base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("client.backend_base_url must start with http:// or https://"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("client.timeout_secs must be a positive number of seconds"));
        }
        if self.project_limit == 0 {
            return Err(anyhow!("client.project_limit must be >= 1"));
        }
        Ok(())
    }
}
