//! API route definitions.

pub mod health;
pub mod uploads;

use axum::Router;

use crate::AppState;

/// Creates all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(uploads::routes())
}
