//! Dynamic configuration service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Admin write ──▶ admin::classify ──▶ admin::writer ──▶ store ──▶ PostgreSQL
//!                                                                      │
//!                                        cache::refresher (interval) ◀─┘
//!                                                │ fetch_all + build
//!                                                ▼
//!   Client poll ──▶ http::values ──▶ query::engine ──▶ cache (ArcSwap<Snapshot>)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use dynconf::config::{self, DynconfConfig};
use dynconf::lifecycle::{self, Shutdown, StartupError};
use dynconf::observability::{logging, metrics};
use dynconf::{ConfigCache, HttpServer};

#[derive(Parser)]
#[command(name = "dynconf")]
#[command(about = "Dynamic configuration and kill-switch service", long_about = None)]
struct Args {
    /// Path to the TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "DYNCONF_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => {
            let mut config = DynconfConfig::default();
            config::loader::apply_overrides(
                &mut config,
                std::env::var(config::loader::DATABASE_URL_ENV).ok(),
            );
            config
        }
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("dynconf v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        store_backend = ?config.store.backend,
        refresh_interval_ms = config.cache.refresh_interval_ms,
        default_service = ?config.cache.default_service,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = lifecycle::build_store(&config.store).await?;
    let cache = Arc::new(ConfigCache::new(store.clone()));
    lifecycle::warm_cache(&cache).await?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(StartupError::Bind)?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store, cache);
    let server_shutdown = shutdown.subscribe();
    let mut server_task = tokio::spawn(server.run(listener, server_shutdown));

    tokio::select! {
        _ = lifecycle::shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => {
            result??;
        }
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
