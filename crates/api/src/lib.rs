//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for upload, listing, download URLs and deletion
//! - Mapping of storage errors to HTTP responses

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use filegate_core::storage::StorageRouter;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage router selecting a backend per request.
    pub storage: Arc<StorageRouter>,
    /// Upper bound on request bodies; `None` disables the limit.
    pub max_upload_bytes: Option<usize>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = match state.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .merge(routes::api_routes())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
