//! Admin subsystem: config writes, deletes and cache control.
//!
//! # Data Flow
//! ```text
//! POST /admin/v1/configs
//!     → classify.rs (required fields, overlap, unknown ids, modes)
//!     → writer.rs (one upsert_batch call)
//!     → store
//! ```

pub mod auth;
pub mod classify;
pub mod handlers;
pub mod writer;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub use classify::{classify, ConfigSubmission, DeleteBatch, DeleteRequest, WriteBatch};
pub use writer::{AdminError, ConfigWriter};

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/v1/configs", post(write_configs))
        .route("/admin/v1/configs/delete", post(delete_configs))
        .route("/admin/v1/status", get(get_status))
        .route("/admin/v1/cache/invalidate", post(invalidate_cache))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
