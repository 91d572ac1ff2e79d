mod config;
mod error;
mod routes;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use quire_core::{DiscoveryConfig, HttpFetcher};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{DEFAULT_LOG_FILTER, ServerConfig};
use crate::routes::{AppState, router};
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    let store = PgStore::connect(&config.database_url).context("Failed to create database pool")?;
    store.migrate().await.context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let mut discovery = DiscoveryConfig::builder();
    if let Some(timeout) = config.fetch_timeout {
        discovery = discovery.timeout(timeout);
    }
    let discovery = discovery.build();
    let fetcher = HttpFetcher::new(&discovery.fetch).context("Failed to build HTTP client")?;

    let state = AppState::new(Arc::new(store), Arc::new(fetcher), discovery);
    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new()),
    );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    tracing::info!(addr = %config.bind, "quire-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
