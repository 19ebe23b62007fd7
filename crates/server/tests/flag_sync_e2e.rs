//! Flag sync client and HTTP host bridge against a live server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};
use client::{project_rows, BridgeError, FlagSyncClient, HostBridge, HttpHostBridge, ProjectsClient};
use common::types::ProjectFlags;
use serde_json::json;
use service::flags::FLAGS_SLOT;
use service::storage::{KvStore, MemoryKvStore};
use tokio::net::TcpListener;

async fn serve(app: Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });
    Ok(format!("http://{}:{}", addr.ip(), addr.port()))
}

async fn start_backend(store: Arc<dyn KvStore>) -> anyhow::Result<String> {
    serve(server::startup::build_app(store)).await
}

/// Upstream tracker stand-in: checks the bearer token and echoes `$top`.
async fn start_upstream() -> anyhow::Result<String> {
    async fn projects(
        headers: HeaderMap,
        Query(q): Query<std::collections::HashMap<String, String>>,
    ) -> Result<Json<serde_json::Value>, (axum::http::StatusCode, Json<serde_json::Value>)> {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer perm:test");
        if !authorized {
            return Err((axum::http::StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))));
        }
        assert!(q.get("fields").is_some_and(|f| f.starts_with("id,name,shortName")));
        let top: usize = q.get("$top").and_then(|t| t.parse().ok()).unwrap_or(0);
        let all = [("0-1", "DEMO-1"), ("0-2", "DEMO-2"), ("0-3", "DEMO-3")];
        let items: Vec<_> = all
            .iter()
            .take(top)
            .map(|(id, short)| json!({"id": id, "name": short, "shortName": short, "description": null}))
            .collect();
        Ok(Json(json!(items)))
    }

    serve(Router::new().route("/api/admin/projects", get(projects))).await
}

#[tokio::test]
async fn toggle_round_trips_through_server() -> anyhow::Result<()> {
    let store = Arc::new(MemoryKvStore::new());
    let base = start_backend(store.clone()).await?;
    let bridge: Arc<dyn HostBridge> = Arc::new(HttpHostBridge::new(base)?);
    let flags = FlagSyncClient::new(bridge);

    flags.fetch_flags().await?;
    assert!(flags.snapshot().flags.is_empty());

    assert!(flags.toggle("DEMO-1").await?);
    assert!(flags.toggle("DEMO-2").await?);
    assert!(!flags.toggle("DEMO-1").await?);

    assert_eq!(
        store.get(FLAGS_SLOT).await?.as_deref(),
        Some(r#"{"DEMO-1":false,"DEMO-2":true}"#)
    );

    // a second client sees the same map after fetching
    let other = FlagSyncClient::new(Arc::new(HttpHostBridge::new(start_backend(store).await?)?));
    other.fetch_flags().await?;
    assert_eq!(other.snapshot().flags, ProjectFlags::from([("DEMO-1", false), ("DEMO-2", true)]));
    Ok(())
}

#[tokio::test]
async fn rejected_write_is_reverted_locally() -> anyhow::Result<()> {
    let base = start_backend(Arc::new(MemoryKvStore::new())).await?;
    let flags = FlagSyncClient::new(Arc::new(HttpHostBridge::new(base)?));

    // empty ids pass the client but the server refuses them
    let err = flags.toggle("").await.unwrap_err();
    assert_eq!(err, BridgeError::Http { status: 400, message: "projectId required".into() });

    let state = flags.snapshot();
    assert!(!state.flags.is_enabled(""));
    assert_eq!(
        state.error.as_deref(),
        Some("Failed to update project flag : HTTP 400: projectId required")
    );

    // whitespace is a valid id and round-trips
    assert!(flags.toggle("  ").await?);
    flags.fetch_flags().await?;
    assert!(flags.snapshot().flags.is_enabled("  "));
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_reports_network_error() -> anyhow::Result<()> {
    let dead = FlagSyncClient::new(Arc::new(HttpHostBridge::new("http://127.0.0.1:1")?));
    assert!(matches!(dead.fetch_flags().await, Err(BridgeError::Network(_))));
    let state = dead.snapshot();
    assert!(state.flags.is_empty());
    assert!(!state.loading);
    assert!(state.error.is_some_and(|e| e.starts_with("Failed to load project flags: network error")));
    Ok(())
}

#[tokio::test]
async fn projects_and_flags_line_up() -> anyhow::Result<()> {
    let backend = start_backend(Arc::new(MemoryKvStore::with_slot(FLAGS_SLOT, r#"{"0-2":true}"#))).await?;
    let upstream = start_upstream().await?;
    let mut cfg = configs::parse(&format!(
        "[client]\nbackend_base_url = \"{backend}/\"\nupstream_base_url = \"{upstream}/\"\n\
         upstream_token = \"perm:test\"\nproject_limit = 2\n"
    ))?;
    cfg.normalize_and_validate()?;
    let bridge: Arc<dyn HostBridge> = Arc::new(HttpHostBridge::from_config(&cfg.client)?);

    let projects = ProjectsClient::from_config(bridge.clone(), &cfg.client);
    let flags = FlagSyncClient::new(bridge);
    let listed = projects.fetch_projects().await?;
    let current = flags.fetch_flags().await?;

    let rows = project_rows(&listed, &current);
    let view: Vec<_> = rows.iter().map(|r| (r.project.short_name.as_str(), r.enabled)).collect();
    assert_eq!(view, vec![("DEMO-1", false), ("DEMO-2", true)]);
    Ok(())
}

#[tokio::test]
async fn upstream_auth_failure_surfaces_message() -> anyhow::Result<()> {
    let upstream = start_upstream().await?;
    let bridge = HttpHostBridge::new("http://127.0.0.1:1")?.with_upstream(upstream, None);
    let projects = ProjectsClient::new(Arc::new(bridge));

    let err = projects.fetch_projects().await.unwrap_err();
    assert_eq!(err, BridgeError::Http { status: 401, message: "Unauthorized".into() });
    assert_eq!(
        projects.snapshot().error.as_deref(),
        Some("Failed to load projects: HTTP 401: Unauthorized")
    );
    Ok(())
}
