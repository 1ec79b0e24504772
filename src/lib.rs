//! Dynamic configuration service library.
//!
//! Operators write configs and kill switches per service; client services
//! poll for them, optionally incrementally. PostgreSQL is the source of
//! truth; a periodically rebuilt in-memory snapshot serves all reads.

pub mod admin;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod query;
pub mod store;

pub use cache::{ConfigCache, Snapshot};
pub use config::DynconfConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use model::{ConfigEntry, Key, Mode};
pub use store::ConfigStore;
