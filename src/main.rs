// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::key_value_store::KeyValueStore;
use crate::application::status_ticker::spawn_status_ticker;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::file_store::FileStore;
use crate::infrastructure::graphql_feed::GraphQlFeed;
use crate::infrastructure::hosted_ui_identity::HostedUiIdentity;
use crate::infrastructure::memory_store::MemoryStore;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;
    let default_devices = config.dashboard.default_devices()?;

    // Create adapters (infrastructure layer)
    let store: Arc<dyn KeyValueStore> = match &config.storage.dir {
        Some(dir) => {
            let store = FileStore::open(dir.clone()).await?;
            tracing::info!("Persisting dashboard slots under {}", store.dir().display());
            Arc::new(store)
        }
        None => {
            tracing::warn!("No storage.dir configured, dashboard slots are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let identity = Arc::new(HostedUiIdentity::new(config.identity.clone()));
    let feed = Arc::new(GraphQlFeed::new(config.graph.endpoint.clone()));

    // Create services and application state
    let state = Arc::new(AppState::build(identity, feed, store, &default_devices).await);
    let ticker = spawn_status_ticker(
        state.dashboard_state.clone(),
        config.dashboard.refresh_interval(),
    );

    // Build router (presentation layer)
    // Compression is negotiated per response, so no CompressionLayer here
    let router = build_router(state.clone());

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting wildfire-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    ticker.abort();
    tracing::info!(
        "Closing {} reading subscriptions",
        state.subscriptions.open_count().await
    );
    state.subscriptions.shutdown().await;
    tracing::info!("Shut down");

    Ok(())
}
