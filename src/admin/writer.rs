//! Admin write path: validate, classify, then hand one batch to the store.

use std::sync::Arc;
use thiserror::Error;

use crate::admin::classify::{ConfigSubmission, DeleteBatch, DeleteRequest, WriteBatch};
use crate::model::{Mode, ValidationError};
use crate::observability::metrics;
use crate::store::{ConfigStore, StoreError};

/// Failures on the admin write and delete paths.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies admin submissions to the store.
///
/// Never touches the snapshot cache; writes become visible to readers at
/// the next successful refresh.
#[derive(Clone)]
pub struct ConfigWriter {
    store: Arc<dyn ConfigStore>,
}

impl ConfigWriter {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Validate `submission` and upsert all of its names in one call.
    pub async fn write(&self, submission: ConfigSubmission) -> Result<WriteBatch, AdminError> {
        let batch = submission.into_batch()?;

        match self
            .store
            .upsert_batch(&batch.service, &batch.values, &batch.modes)
            .await
        {
            Ok(()) => {
                metrics::record_store_write("upsert", "ok");
                tracing::info!(
                    service = %batch.service,
                    configs = batch.values.len(),
                    kill_switches_enabled = batch.count(Mode::KillSwitchEnabled),
                    kill_switches_disabled = batch.count(Mode::KillSwitchDisabled),
                    "Configs written"
                );
                Ok(batch)
            }
            Err(e) => {
                metrics::record_store_write("upsert", "error");
                tracing::error!(service = %batch.service, error = %e, "Config write failed");
                Err(e.into())
            }
        }
    }

    /// Validate `request` and delete its names in one call.
    pub async fn delete(&self, request: DeleteRequest) -> Result<DeleteBatch, AdminError> {
        let batch = request.into_batch()?;

        match self.store.delete_batch(&batch.service, &batch.names).await {
            Ok(()) => {
                metrics::record_store_write("delete", "ok");
                tracing::info!(
                    service = %batch.service,
                    ids = batch.names.len(),
                    "Configs deleted"
                );
                Ok(batch)
            }
            Err(e) => {
                metrics::record_store_write("delete", "error");
                tracing::error!(service = %batch.service, error = %e, "Config delete failed");
                Err(e.into())
            }
        }
    }
}
