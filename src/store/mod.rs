//! Persistent configuration store.
//!
//! # Data Flow
//! ```text
//! admin handlers ── upsert_batch / delete_batch ──▶ ConfigStore ──▶ PostgreSQL
//! cache refresher ── fetch_all ───────────────────▶ ConfigStore ──▶ PostgreSQL
//! ```
//!
//! # Design Decisions
//! - Thin executor: no business logic lives behind this trait
//! - One call per admin request; never per-name round trips
//! - Rows that fail to decode fail the whole scan

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::{ConfigEntry, Mode};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors raised by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection, query or pool failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A fetched row could not be decoded into a `ConfigEntry`.
    #[error("malformed row {key}: {reason}")]
    MalformedRow { key: String, reason: String },

    /// Schema setup failed.
    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations the core needs from the source of truth.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Full scan of every row.
    async fn fetch_all(&self) -> StoreResult<Vec<ConfigEntry>>;

    /// Insert or update every name of `values` for `service` in one batch.
    ///
    /// `modes` carries a mode for each name of `values`. Every affected row
    /// gets `updated_at` set to the store clock, including rows whose value
    /// is unchanged.
    async fn upsert_batch(
        &self,
        service: &str,
        values: &BTreeMap<String, Value>,
        modes: &BTreeMap<String, Mode>,
    ) -> StoreResult<()>;

    /// Delete `names` of `service`. Missing names are ignored.
    async fn delete_batch(&self, service: &str, names: &BTreeSet<String>) -> StoreResult<()>;

    /// Short backend name for logs and metrics.
    fn backend_name(&self) -> &'static str;
}
