pub mod access;
pub mod auth;
pub mod billing;
pub mod catalog;
pub mod config;
pub mod error;
pub mod integrations;
pub mod models;
pub mod progress;
pub mod routes;
pub mod state;
pub mod store;
pub mod video;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

pub use state::AppState;

/// Full HTTP surface: health check plus the API routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(state))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}
