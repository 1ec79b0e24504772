use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};

use crate::http::request::request_id;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::query::{ValuesRequest, ValuesResponse};

/// `POST /configs/values`: answer a client poll from the current snapshot.
pub async fn post_values(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ValuesRequest>, JsonRejection>,
) -> Result<Json<ValuesResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.queries.query(&request)?;

    tracing::debug!(
        request_id = request_id(&headers),
        service = request.service.as_deref().unwrap_or_default(),
        ids = request.ids.as_ref().map_or(0, Vec::len),
        since = ?request.updated_since,
        returned = response.configs.len(),
        watermark = %response.updated_at,
        "Served config values"
    );

    Ok(Json(response))
}

/// `GET /ping`: liveness.
pub async fn ping() -> &'static str {
    "pong"
}
