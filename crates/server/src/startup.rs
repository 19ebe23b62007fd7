use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StoreBackend};
use service::{
    flags::KvFlagRepository,
    storage::{FileKvStore, KvStore, MemoryKvStore},
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the configured slot store.
pub async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn KvStore>, StartupError> {
    match cfg.store.backend {
        StoreBackend::File => {
            let store: Arc<dyn KvStore> = FileKvStore::new(&cfg.store.path).await?;
            info!(path = %cfg.store.path.display(), "using file-backed kv store");
            Ok(store)
        }
        StoreBackend::Memory => {
            warn!("using in-memory kv store; flags are lost on restart");
            Ok(Arc::new(MemoryKvStore::new()))
        }
    }
}

/// Build the router over an already opened store.
pub fn build_app(store: Arc<dyn KvStore>) -> Router {
    let repo = Arc::new(KvFlagRepository::new(store));
    routes::build_router(ServerState::new(repo), build_cors())
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    cfg.server
        .bind_addr()
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let store = build_store(&cfg).await?;
    let app = build_app(store);

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting project flags server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
