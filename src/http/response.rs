//! Error responses.
//!
//! # Responsibilities
//! - Map validation, store and auth failures to HTTP status codes
//! - Render every error as `{"code": "...", "message": "..."}`
//!
//! # Design Decisions
//! - Validation messages are returned verbatim
//! - Store failure details stay in the logs, not in the response body

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::writer::AdminError;
use crate::model::ValidationError;
use crate::store::StoreError;

/// Wire shape of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16().to_string(),
            message: message.into(),
        }
    }
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Body was not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    /// Write or delete could not reach the store.
    #[error("Config store is unavailable")]
    Store(#[source] StoreError),

    /// A forced cache refresh failed.
    #[error("Cache refresh failed, previous snapshot kept")]
    RefreshFailed(#[source] StoreError),

    #[error("Missing or invalid admin credentials")]
    Unauthorized,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RefreshFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::Validation(e) => ApiError::Validation(e),
            AdminError::Store(e) => ApiError::Store(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody::new(status, self.to_string()))).into_response()
    }
}
