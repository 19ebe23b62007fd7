use std::sync::Arc;

use axum::{routing::get, Json, Router};
use service::flags::FlagRepository;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::metrics;

pub mod flags;

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    pub flags: Arc<dyn FlagRepository>,
}

impl ServerState {
    pub fn new(flags: Arc<dyn FlagRepository>) -> Self {
        Self { flags }
    }
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_handler() -> (axum::http::StatusCode, String) {
    metrics::encode_metrics()
}

/// Build the full application router: health, metrics and the
/// globally scoped flag endpoints under `/backend`.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    metrics::init();

    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler));

    let backend = Router::new().route(
        "/backend/project-flags",
        get(flags::get_project_flags).put(flags::put_project_flag),
    );

    public
        .merge(backend)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one span per request, method and path included
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // status code and latency
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
