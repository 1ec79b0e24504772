use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::admin::classify::{ConfigSubmission, DeleteRequest};
use crate::cache::RefreshReport;
use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub store_backend: &'static str,
    pub snapshot: SnapshotStatus,
}

#[derive(Serialize)]
pub struct SnapshotStatus {
    pub entries: usize,
    pub services: usize,
    pub built_at: DateTime<Utc>,
    pub age_ms: i64,
}

/// `POST /admin/v1/configs`
pub async fn write_configs(
    State(state): State<AppState>,
    payload: Result<Json<ConfigSubmission>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(submission) = payload?;
    state.writer.write(submission).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/v1/configs/delete`
pub async fn delete_configs(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    state.writer.delete(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/v1/status`
pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshot = state.cache.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        store_backend: state.store_backend,
        snapshot: SnapshotStatus {
            entries: snapshot.len(),
            services: snapshot.service_count(),
            built_at: snapshot.built_at(),
            age_ms: snapshot.age().num_milliseconds(),
        },
    })
}

/// `POST /admin/v1/cache/invalidate`: rebuild the snapshot now.
pub async fn invalidate_cache(
    State(state): State<AppState>,
) -> Result<Json<RefreshReport>, ApiError> {
    match state.cache.refresh().await {
        Ok(report) => {
            tracing::info!(entries = report.entries, "Cache invalidated on request");
            Ok(Json(report))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Forced cache refresh failed");
            Err(ApiError::RefreshFailed(e))
        }
    }
}
