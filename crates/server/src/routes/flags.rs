use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use common::types::ProjectFlags;
use service::errors::ServiceError;

use crate::errors::ApiError;
use crate::metrics;
use crate::routes::ServerState;

#[derive(Serialize, Debug)]
pub struct FlagsResponse {
    pub flags: ProjectFlags,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetFlagResponse {
    pub ok: bool,
    pub project_id: String,
    pub enabled: bool,
}

/// `GET /backend/project-flags`
pub async fn get_project_flags(
    State(state): State<ServerState>,
) -> Result<Json<FlagsResponse>, ApiError> {
    let flags = state.flags.get_all().await.map_err(ApiError::internal)?;
    metrics::FLAG_READS_TOTAL.inc();
    debug!(count = flags.len(), "project flags served");
    Ok(Json(FlagsResponse { flags }))
}

/// `PUT /backend/project-flags` with `{"projectId": "...", "enabled": bool}`.
///
/// The body is inspected field by field so a missing `projectId` gets its
/// own message instead of a generic deserialization rejection.
pub async fn put_project_flag(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SetFlagResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        warn!(error = %e, "rejected project flag body");
        metrics::FLAG_REJECTED_TOTAL.inc();
        ApiError::bad_request("invalid request body")
    })?;

    let project_id = body
        .get("projectId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty());
    let Some(project_id) = project_id else {
        metrics::FLAG_REJECTED_TOTAL.inc();
        return Err(ApiError::bad_request("projectId required"));
    };
    let Some(enabled) = body.get("enabled").and_then(Value::as_bool) else {
        metrics::FLAG_REJECTED_TOTAL.inc();
        return Err(ApiError::bad_request("enabled required"));
    };

    match state.flags.set_flag(project_id, enabled).await {
        Ok(_) => {
            metrics::FLAG_WRITES_TOTAL.inc();
            Ok(Json(SetFlagResponse { ok: true, project_id: project_id.to_string(), enabled }))
        }
        Err(e) => {
            if matches!(e, ServiceError::InvalidArgument(_)) {
                metrics::FLAG_REJECTED_TOTAL.inc();
            } else {
                metrics::FLAG_WRITE_FAILURES_TOTAL.inc();
            }
            Err(e.into())
        }
    }
}
