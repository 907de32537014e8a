//! HTTP API layer with Axum routes and the storage contract.
//!
//! This crate provides:
//! - The four-operation storage contract ({save, exists, serve, delete})
//! - REST API routes (uploads, health)
//! - Static asset serving and theme-archive downloads

pub mod archive;
pub mod routes;
pub mod serve;
pub mod store;

use std::sync::Arc;

use axum::Router;
use inkwell_shared::PathsConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::store::{FileStore, ServeOptions};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend for uploaded assets.
    pub storage: Arc<dyn FileStore>,
    /// Content path configuration.
    pub paths: PathsConfig,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let assets = state.storage.serve(&ServeOptions::default());
    let themes = state.storage.serve(&ServeOptions { is_theme: true });

    let public_subdir = state.paths.public_subdir.clone();

    Router::new()
        .nest("/api/v1", routes::api_routes())
        .nest_service(&public_subdir, assets)
        .nest_service("/content/themes", themes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
