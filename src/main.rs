//! Redis-backed API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────┐
//!                     │                   GATEWAY                      │
//!                     │                                                │
//!   Client Request    │  ┌──────────┐   ┌───────────┐   ┌──────────┐  │
//!   ──────────────────┼─▶│   auth   │──▶│ admission │──▶│ selector │  │
//!                     │  │ (bearer) │   │ (fixed    │   │ (least   │  │
//!                     │  └──────────┘   │  window)  │   │  conns)  │  │
//!                     │                 └───────────┘   └────┬─────┘  │
//!                     │                                      ▼        │
//!   Client Response   │  ┌──────────┐                 ┌────────────┐  │
//!   ◀─────────────────┼──│  relay   │◀────────────────│ dispatcher │◀─┼── Upstream
//!                     │  └──────────┘                 └────────────┘  │
//!                     │                                                │
//!                     │  shared state store (Redis): health, failures, │
//!                     │  latency, connection counts, quota windows     │
//!                     │                                                │
//!                     │  health monitor: background probe loop writing │
//!                     │  the records the selector reads                │
//!                     └────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::config;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;
use api_gateway::observability::metrics;
use api_gateway::store::{RedisStore, StateStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("api-gateway v0.1.0 starting");

    let config = config::load_from_env()?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstreams = ?config.upstreams,
        redis_url = %config.store.redis_url,
        rate_limit = config.rate_limit.limit,
        rate_limit_window_secs = config.rate_limit.window_secs,
        "configuration loaded"
    );

    // Startup requires a reachable store; runtime store loss only degrades.
    let store: Arc<dyn StateStore> = Arc::new(RedisStore::connect(&config.store.redis_url).await?);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "failed to parse metrics address"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
