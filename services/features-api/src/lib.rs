//! Features API Service Library
//!
//! This crate provides the HTTP server implementation for the
//! OGC API - Features items endpoints, with cursor-based pagination.

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod content_negotiation;
pub mod handlers;
pub mod query;
pub mod state;

use state::AppState;

/// Build the service router with all middleware applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/collections/:collection_id/items",
            get(handlers::features::get_features_handler),
        )
        .route(
            "/collections/:collection_id/items/:feature_id",
            get(handlers::features::get_feature_handler),
        )
        .route("/health", get(handlers::health::health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
