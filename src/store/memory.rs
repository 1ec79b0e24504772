//! Process-local store.
//!
//! Used by tests, demos and `backend = "memory"` deployments. Keeps the same
//! contract as the PostgreSQL adapter: batches apply under a single lock and
//! `updated_at` strictly increases on every write.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use crate::model::{ConfigEntry, Key, Mode};
use crate::store::{ConfigStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    rows: BTreeMap<Key, ConfigEntry>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Store clock: wall time, bumped by 1µs when it would not advance.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// In-memory `ConfigStore`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`, keeping their timestamps.
    pub fn with_entries(entries: impl IntoIterator<Item = ConfigEntry>) -> Self {
        let mut inner = Inner::default();
        for entry in entries {
            if inner.last_stamp.map_or(true, |last| entry.updated_at > last) {
                inner.last_stamp = Some(entry.updated_at);
            }
            inner.rows.insert(entry.key.clone(), entry);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Number of stored rows.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.rows.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn fetch_all(&self) -> StoreResult<Vec<ConfigEntry>> {
        Ok(self.read()?.rows.values().cloned().collect())
    }

    async fn upsert_batch(
        &self,
        service: &str,
        values: &BTreeMap<String, Value>,
        modes: &BTreeMap<String, Mode>,
    ) -> StoreResult<()> {
        let mut inner = self.write()?;
        let stamp = inner.next_stamp();

        // Same shape as the SQL join: only names present in both maps land.
        for (name, value) in values {
            let Some(mode) = modes.get(name) else {
                continue;
            };
            let key = Key::new(service, name.as_str());
            inner.rows.insert(
                key.clone(),
                ConfigEntry {
                    key,
                    value: value.clone(),
                    mode: *mode,
                    updated_at: stamp,
                },
            );
        }
        Ok(())
    }

    async fn delete_batch(&self, service: &str, names: &BTreeSet<String>) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner
            .rows
            .retain(|key, _| !(key.service == service && names.contains(&key.config_name)));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
