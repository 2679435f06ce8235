//! Rollup Engine
//!
//! Multi-resolution metrics pipeline for service monitoring:
//! - Raw request and system metric collection over HTTP
//! - Minute, hour and day rollups on wall-clock boundaries
//! - Resolution-switching series reads and a service health overview

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use engine_core::{MemoryStore, MetricStore};
use telemetry::{health, init_tracing_from_env};
use worker::{RollupScheduler, SchedulerConfig};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreBackend {
    Memory,
    ClickHouse,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "clickhouse" => Ok(Self::ClickHouse),
            other => bail!("unknown store backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreConfig {
    #[serde(default = "default_backend")]
    backend: StoreBackend,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    scheduler: SchedulerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store: StoreConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Rollup Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        backend = ?config.store.backend,
        scheduler = ?config.scheduler,
        "Loaded configuration"
    );

    let store = build_store(&config).await;

    if store.ping().await {
        health().store.set_healthy();
        info!("Store connection: healthy");
    } else {
        health().store.set_unhealthy("Connection failed");
        error!("Store connection: unhealthy");
    }

    // Rollup scheduler: optional catch-up, then the boundary timer
    let scheduler = Arc::new(RollupScheduler::new(config.scheduler.clone(), store.clone()));
    match scheduler.catch_up(chrono::Utc::now().timestamp_millis()).await {
        Some(Ok(result)) => info!(result = ?result, "Catch-up complete"),
        Some(Err(e)) => warn!("Catch-up failed: {}", e),
        None => {}
    }
    let scheduler_handle = scheduler.start();

    let app = router(AppState::new(store));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    // Stop the boundary timer
    scheduler_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Build the configured store. ClickHouse schema setup failures are logged
/// and startup continues: the tables may already exist.
async fn build_store(config: &Config) -> Arc<dyn MetricStore> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::ClickHouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());
            if config.clickhouse.init_schema {
                if let Err(e) = clickhouse_client::init_schema(&client).await {
                    error!("Failed to initialize ClickHouse schema: {}", e);
                }
            }
            Arc::new(ClickHouseStore::new(client))
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ROLLUP")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested values; the config crate's nested parsing
    // doesn't work reliably with underscored field names
    if let Ok(backend) = std::env::var("ROLLUP_STORE_BACKEND") {
        config.store.backend = backend.parse()?;
    }
    if let Ok(url) = std::env::var("ROLLUP_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("ROLLUP_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("ROLLUP_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("ROLLUP_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
