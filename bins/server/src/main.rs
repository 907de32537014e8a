//! Inkwell API Server
//!
//! Main entry point for the Inkwell asset storage service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkwell_api::{AppState, create_router};
use inkwell_core::storage::CouchAssetStore;
use inkwell_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwell=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to the document store and make sure its database exists
    let store = CouchAssetStore::from_config(config.paths.clone(), &config.couch)
        .context("Failed to construct document store client")?;
    store
        .initialize()
        .await
        .context("Failed to initialize document store")?;
    info!(database = %config.couch.database_name(), "Document store ready");

    // Create application state
    let state = AppState {
        storage: Arc::new(store),
        paths: config.paths.clone(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
