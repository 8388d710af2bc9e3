//! eventflow server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use eventflow::api;
use eventflow::app_state::AppState;
use eventflow::config::ServiceConfig;
use eventflow::domain::EventBus;
use eventflow::persistence::{EnrollmentStore, MemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("invalid LISTEN_ADDR")?;
    init_tracing(config.log_json);
    tracing::info!(addr = %config.listen_addr, "starting eventflow");

    let store = build_store(&config).await?;
    let event_bus = EventBus::new(config.event_bus_capacity);
    let app = api::app(AppState::new(store, event_bus), config.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn EnrollmentStore>> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PostgresStore::connect(config)
        .await
        .context("failed to connect to PostgreSQL")?;
    if config.run_migrations {
        store.migrate().await.context("failed to run migrations")?;
        tracing::info!("database migrations applied");
    }
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
