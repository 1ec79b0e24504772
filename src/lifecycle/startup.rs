//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the configured store and apply its schema
//! - Warm the snapshot cache before any traffic is accepted
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;
use thiserror::Error;

use crate::cache::{ConfigCache, RefreshReport};
use crate::config::{StoreBackend, StoreConfig};
use crate::store::{ConfigStore, MemoryStore, PostgresStore, StoreError};

/// Fatal errors during startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to store: {0}")]
    Store(#[source] StoreError),

    #[error("failed to apply store schema: {0}")]
    Migration(#[source] StoreError),

    #[error("initial cache load failed: {0}")]
    Warmup(#[source] StoreError),

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Construct the store named by `config.backend`.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn ConfigStore>, StartupError> {
    match config.backend {
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(config)
                .await
                .map_err(StartupError::Store)?;
            if config.run_migrations {
                store.run_migrations().await.map_err(StartupError::Migration)?;
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; configs are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Load the first snapshot.
pub async fn warm_cache(cache: &ConfigCache) -> Result<RefreshReport, StartupError> {
    let report = cache.refresh().await.map_err(StartupError::Warmup)?;
    tracing::info!(
        entries = report.entries,
        services = report.services,
        "Config cache warmed"
    );
    Ok(report)
}
