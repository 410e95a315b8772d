//! Geobin server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `geobin-config.yaml` (or `GEOBIN_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the bin store (Redis or in-memory)
//! 4. Serve HTTP until Ctrl-C / SIGTERM
//! 5. Close the store

use std::sync::Arc;

use geobin_db::{BinStore, MemoryStore, RedisStore};
use geobin_server::config::{GeobinConfig, LoggingConfig, StorageBackend};
use geobin_server::{AppState, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage, or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration; logging depends on it.
    let config = GeobinConfig::load()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        host = config.server.host,
        port = config.server.port,
        backend = ?config.storage.backend,
        ttl_hours = config.bins.ttl_hours,
        requests_per_second = config.limits.requests_per_second,
        "geobin-server starting"
    );

    // 3. Connect storage.
    let store: BinStore = match config.storage.backend {
        StorageBackend::Redis => RedisStore::connect(&config.storage.redis_url()).await?.into(),
        StorageBackend::Memory => MemoryStore::new().into(),
    };

    // 4. Serve.
    let state = Arc::new(AppState::new(&config, store.clone())?);
    start_server(&config.server, state).await?;

    // 5. Close.
    store.close().await?;
    info!("geobin-server exited cleanly");
    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
