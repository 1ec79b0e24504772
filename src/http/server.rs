//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeouts, body limit, request ID, metrics)
//! - Own the cache refresher for the lifetime of the server
//! - Serve until the shutdown signal fires

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{self, ConfigWriter};
use crate::cache::{CacheRefresher, ConfigCache};
use crate::config::DynconfConfig;
use crate::http::request::{track_metrics, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::values::{ping, post_values};
use crate::query::QueryEngine;
use crate::store::ConfigStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ConfigCache>,
    pub queries: QueryEngine,
    pub writer: ConfigWriter,
    pub store_backend: &'static str,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ConfigStore>, cache: Arc<ConfigCache>, config: &DynconfConfig) -> Self {
        Self {
            queries: QueryEngine::new(cache.clone(), config.cache.default_service.clone()),
            writer: ConfigWriter::new(store.clone()),
            store_backend: store.backend_name(),
            cache,
            admin_api_key: config.admin.api_key.as_deref().map(Arc::from),
        }
    }
}

/// HTTP server for the config service.
pub struct HttpServer {
    router: Router,
    config: DynconfConfig,
    cache: Arc<ConfigCache>,
}

impl HttpServer {
    /// Create a server over `store`, serving from `cache`.
    ///
    /// The cache is expected to be warmed by the caller.
    pub fn new(config: DynconfConfig, store: Arc<dyn ConfigStore>, cache: Arc<ConfigCache>) -> Self {
        let state = AppState::new(store, cache.clone(), &config);
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            cache,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &DynconfConfig, state: AppState) -> Router {
        let public = Router::new()
            .route("/configs/values", post(post_values))
            .route("/ping", get(ping))
            .with_state(state.clone());

        public
            .merge(admin::setup_admin_router(state))
            .layer(middleware::from_fn(track_metrics))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Spawns the cache refresher and stops both when `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let refresher = CacheRefresher::new(self.cache.clone(), &self.config.cache);
        let refresher_handle = tokio::spawn(refresher.run(shutdown.resubscribe()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Err(e) = refresher_handle.await {
            tracing::error!(error = %e, "Cache refresher task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
