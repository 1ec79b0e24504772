//! Snapshot cache subsystem.
//!
//! # Data Flow
//! ```text
//! refresher.rs (fixed interval tick)
//!     → ConfigStore::fetch_all
//!     → snapshot.rs (build a complete Snapshot from scratch)
//!     → ConfigCache::swap (single ArcSwap store)
//!
//! query engine
//!     → ConfigCache::current (lock-free load of Arc<Snapshot>)
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; a refresh never mutates what a reader holds
//! - A failed refresh keeps the previous snapshot; staleness is the symptom
//! - Writes do not invalidate the cache; visibility is bounded by the
//!   refresh interval
//! - Refreshes are serialized, so a scan that started earlier can never
//!   replace a snapshot built from a later one

pub mod refresher;
pub mod snapshot;

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::store::{ConfigStore, StoreResult};

pub use refresher::CacheRefresher;
pub use snapshot::Snapshot;

/// Outcome of a successful refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub entries: usize,
    pub services: usize,
    #[serde(with = "duration_ms")]
    pub took: Duration,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Holds the current snapshot and rebuilds it from the store.
pub struct ConfigCache {
    current: ArcSwap<Snapshot>,
    store: Arc<dyn ConfigStore>,
    /// Held from scan start until swap.
    refresh_lock: Mutex<()>,
}

impl ConfigCache {
    /// Create a cache serving an empty snapshot until the first refresh.
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Latest fully built snapshot. Never waits on an in-flight refresh.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Fetch every row, build a new snapshot and swap it in.
    ///
    /// On error the previous snapshot stays current. Concurrent callers
    /// queue behind the one in flight and then scan for themselves.
    pub async fn refresh(&self) -> StoreResult<RefreshReport> {
        let _guard = self.refresh_lock.lock().await;
        let started = Instant::now();

        let rows = match self.store.fetch_all().await {
            Ok(rows) => rows,
            Err(e) => {
                metrics::record_cache_refresh("error", started);
                return Err(e);
            }
        };

        let snapshot = Snapshot::build(rows);
        let report = RefreshReport {
            entries: snapshot.len(),
            services: snapshot.service_count(),
            took: started.elapsed(),
        };
        self.swap(snapshot);

        metrics::record_cache_refresh("ok", started);
        metrics::record_cache_entries(report.entries);
        tracing::debug!(
            entries = report.entries,
            services = report.services,
            took_ms = report.took.as_millis() as u64,
            backend = self.store.backend_name(),
            "Config snapshot refreshed"
        );
        Ok(report)
    }

    /// Replace the current snapshot.
    pub fn swap(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigEntry, Key, Mode};
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose scans can be switched to fail.
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    #[async_trait]
    impl ConfigStore for FlakyStore {
        async fn fetch_all(&self) -> StoreResult<Vec<ConfigEntry>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::MalformedRow {
                    key: "svc1/bad".into(),
                    reason: "unknown config mode 'on'".into(),
                });
            }
            self.inner.fetch_all().await
        }

        async fn upsert_batch(
            &self,
            service: &str,
            values: &BTreeMap<String, Value>,
            modes: &BTreeMap<String, Mode>,
        ) -> StoreResult<()> {
            self.inner.upsert_batch(service, values, modes).await
        }

        async fn delete_batch(&self, service: &str, names: &BTreeSet<String>) -> StoreResult<()> {
            self.inner.delete_batch(service, names).await
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    async fn write(store: &dyn ConfigStore, service: &str, name: &str, value: Value) {
        let values = [(name.to_string(), value)].into();
        let modes = [(name.to_string(), Mode::DynamicConfig)].into();
        store.upsert_batch(service, &values, &modes).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_invisible_until_refresh() {
        let store = Arc::new(MemoryStore::new());
        let cache = ConfigCache::new(store.clone());

        write(store.as_ref(), "svc1", "a", json!(1)).await;
        assert!(cache.current().get(&Key::new("svc1", "a")).is_none());

        let report = cache.refresh().await.unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(report.services, 1);
        assert_eq!(cache.current().get(&Key::new("svc1", "a")).unwrap().value, json!(1));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        });
        let cache = ConfigCache::new(store.clone());

        write(store.as_ref(), "svc1", "a", json!(1)).await;
        cache.refresh().await.unwrap();
        let before = cache.current();

        write(store.as_ref(), "svc1", "b", json!(2)).await;
        store.failing.store(true, Ordering::SeqCst);
        let err = cache.refresh().await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedRow { .. }));

        let after = cache.current();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.len(), 1);
        assert!(after.get(&Key::new("svc1", "b")).is_none());

        store.failing.store(false, Ordering::SeqCst);
        cache.refresh().await.unwrap();
        assert_eq!(cache.current().len(), 2);
    }

    #[tokio::test]
    async fn test_reader_keeps_its_snapshot_across_swap() {
        let store = Arc::new(MemoryStore::new());
        let cache = ConfigCache::new(store.clone());
        let held = cache.current();

        write(store.as_ref(), "svc1", "a", json!(1)).await;
        cache.refresh().await.unwrap();

        assert!(held.is_empty());
        assert_eq!(cache.current().len(), 1);
    }

    /// First scan reads its rows, then stalls until released.
    struct SlowFirstScan {
        inner: MemoryStore,
        first: AtomicBool,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl ConfigStore for SlowFirstScan {
        async fn fetch_all(&self) -> StoreResult<Vec<ConfigEntry>> {
            let rows = self.inner.fetch_all().await?;
            if self.first.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(rows)
        }

        async fn upsert_batch(
            &self,
            service: &str,
            values: &BTreeMap<String, Value>,
            modes: &BTreeMap<String, Mode>,
        ) -> StoreResult<()> {
            self.inner.upsert_batch(service, values, modes).await
        }

        async fn delete_batch(&self, service: &str, names: &BTreeSet<String>) -> StoreResult<()> {
            self.inner.delete_batch(service, names).await
        }

        fn backend_name(&self) -> &'static str {
            "slow-first-scan"
        }
    }

    #[tokio::test]
    async fn test_slow_scan_never_replaces_newer_snapshot() {
        let store = Arc::new(SlowFirstScan {
            inner: MemoryStore::new(),
            first: AtomicBool::new(true),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let cache = Arc::new(ConfigCache::new(store.clone()));

        let slow = tokio::spawn({
            let cache = cache.clone();
            async move { cache.refresh().await }
        });
        store.entered.notified().await;

        write(store.as_ref(), "svc1", "a", json!(1)).await;
        let forced = tokio::spawn({
            let cache = cache.clone();
            async move { cache.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.release.notify_one();
        let slow_report = slow.await.unwrap().unwrap();
        let forced_report = forced.await.unwrap().unwrap();

        assert_eq!(slow_report.entries, 0);
        assert_eq!(forced_report.entries, 1);
        assert_eq!(cache.current().get(&Key::new("svc1", "a")).unwrap().value, json!(1));
    }
}
