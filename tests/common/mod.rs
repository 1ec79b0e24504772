//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dynconf::config::DynconfConfig;
use dynconf::lifecycle::warm_cache;
use dynconf::store::{ConfigStore, MemoryStore};
use dynconf::{ConfigCache, HttpServer, Shutdown};
use serde_json::Value;
use tokio::net::TcpListener;

/// A running server bound to an ephemeral local port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub store: Arc<dyn ConfigStore>,
    pub cache: Arc<ConfigCache>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("server unreachable")
    }

    /// Force a snapshot rebuild so prior writes become visible.
    pub async fn invalidate(&self) {
        let res = self
            .client
            .post(self.url("/admin/v1/cache/invalidate"))
            .send()
            .await
            .expect("server unreachable");
        assert_eq!(res.status(), 200);
    }

    pub async fn values(&self, body: Value) -> (u16, Value) {
        let res = self.post("/configs/values", body).await;
        let status = res.status().as_u16();
        let json = res.json().await.expect("response is not JSON");
        (status, json)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with background refresh effectively disabled, so tests decide
/// when writes become visible.
pub fn manual_refresh_config() -> DynconfConfig {
    let mut config = DynconfConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.cache.refresh_interval_ms = 3_600_000;
    config
}

pub async fn start_server(config: DynconfConfig) -> TestServer {
    start_server_with_store(config, Arc::new(MemoryStore::new())).await
}

pub async fn start_server_with_store(
    config: DynconfConfig,
    store: Arc<dyn ConfigStore>,
) -> TestServer {
    let cache = Arc::new(ConfigCache::new(store.clone()));
    warm_cache(&cache).await.expect("warmup failed");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store.clone(), cache.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    TestServer {
        addr,
        client,
        store,
        cache,
        shutdown,
    }
}

/// Poll `check` until it holds or `timeout` elapses.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}
