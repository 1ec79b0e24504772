//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, metrics)
//!     → values.rs (client polls) | admin::handlers (writes, deletes)
//!     → response.rs (error bodies)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod values;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, ErrorBody};
pub use server::{AppState, HttpServer};
