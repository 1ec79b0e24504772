//! Background snapshot refresh.
//!
//! # Responsibilities
//! - Rebuild the snapshot on a fixed cadence, independent of traffic
//! - Bound each rebuild with a deadline
//! - Keep serving the previous snapshot when a rebuild fails

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::cache::ConfigCache;
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Periodically refreshes a `ConfigCache`.
pub struct CacheRefresher {
    cache: Arc<ConfigCache>,
    interval: Duration,
    timeout: Duration,
}

impl CacheRefresher {
    pub fn new(cache: Arc<ConfigCache>, config: &CacheConfig) -> Self {
        Self {
            cache,
            interval: config.refresh_interval(),
            timeout: config.refresh_timeout(),
        }
    }

    /// Run until `shutdown` fires.
    ///
    /// The first refresh happens one interval after start; startup warms
    /// the cache itself. Ticks missed while a refresh is running are
    /// skipped, so a slow store never builds a backlog.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            "Cache refresher starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.refresh_once().await {
                        if consecutive_failures > 0 {
                            tracing::info!(
                                failed_cycles = consecutive_failures,
                                "Cache refresh recovered"
                            );
                        }
                        consecutive_failures = 0;
                    } else {
                        consecutive_failures += 1;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One bounded refresh. Returns whether a new snapshot was swapped in.
    pub async fn refresh_once(&self) -> bool {
        let started = std::time::Instant::now();
        match time::timeout(self.timeout, self.cache.refresh()).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    snapshot_age_ms = self.cache.current().age().num_milliseconds(),
                    "Cache refresh failed, serving previous snapshot"
                );
                false
            }
            Err(_) => {
                metrics::record_cache_refresh("timeout", started);
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    snapshot_age_ms = self.cache.current().age().num_milliseconds(),
                    "Cache refresh timed out, serving previous snapshot"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigEntry, Key, Mode};
    use crate::store::{ConfigStore, MemoryStore, StoreResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{BTreeMap, BTreeSet};

    /// Scans never finish in time.
    struct StuckStore;

    #[async_trait]
    impl ConfigStore for StuckStore {
        async fn fetch_all(&self) -> StoreResult<Vec<ConfigEntry>> {
            std::future::pending().await
        }

        async fn upsert_batch(
            &self,
            _service: &str,
            _values: &BTreeMap<String, Value>,
            _modes: &BTreeMap<String, Mode>,
        ) -> StoreResult<()> {
            Ok(())
        }

        async fn delete_batch(&self, _service: &str, _names: &BTreeSet<String>) -> StoreResult<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "stuck"
        }
    }

    fn config(interval_ms: u64, timeout_ms: u64) -> CacheConfig {
        CacheConfig {
            refresh_interval_ms: interval_ms,
            refresh_timeout_ms: timeout_ms,
            default_service: None,
        }
    }

    #[tokio::test]
    async fn test_timeout_keeps_previous_snapshot() {
        let cache = Arc::new(ConfigCache::new(Arc::new(StuckStore)));
        let before = cache.current();
        let refresher = CacheRefresher::new(cache.clone(), &config(1_000, 20));

        assert!(!refresher.refresh_once().await);
        assert!(Arc::ptr_eq(&before, &cache.current()));
    }

    #[tokio::test]
    async fn test_background_refresh_picks_up_writes() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(ConfigCache::new(store.clone()));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(CacheRefresher::new(cache.clone(), &config(20, 1_000)).run(rx));

        let values = [("a".to_string(), json!(1))].into();
        let modes = [("a".to_string(), Mode::DynamicConfig)].into();
        store.upsert_batch("svc1", &values, &modes).await.unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while cache.current().get(&Key::new("svc1", "a")).is_none() {
            assert!(std::time::Instant::now() < deadline, "write never became visible");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("refresher did not stop")
            .unwrap();
    }

    /// Counts scans; the first one takes `first_scan` to return.
    struct SlowScanStore {
        inner: MemoryStore,
        scans: std::sync::atomic::AtomicUsize,
        first_scan: Duration,
    }

    #[async_trait]
    impl ConfigStore for SlowScanStore {
        async fn fetch_all(&self) -> StoreResult<Vec<ConfigEntry>> {
            let n = self.scans.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                tokio::time::sleep(self.first_scan).await;
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
            "slow-scan"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_refresh_skips_missed_ticks() {
        use std::sync::atomic::Ordering;

        let store = Arc::new(SlowScanStore {
            inner: MemoryStore::new(),
            scans: Default::default(),
            first_scan: Duration::from_millis(300),
        });
        let cache = Arc::new(ConfigCache::new(store.clone()));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(CacheRefresher::new(cache, &config(100, 10_000)).run(rx));

        // Scan at 100 runs until 400. One overdue tick fires at 400, the
        // rest are dropped and the schedule resumes at 500 and 600. A burst
        // would replay 200, 300 and 400 back to back.
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(store.scans.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.scans.load(Ordering::SeqCst), 4);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
