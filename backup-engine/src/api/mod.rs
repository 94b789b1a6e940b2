//! HTTP API for listing, creating, verifying and restoring backups.

pub mod backups;
pub mod error;
pub mod health;

use crate::engine::BackupEngine;
use axum::routing::get;
use axum::Router;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: BackupEngine,
    pub started: Instant,
}

impl AppState {
    pub fn new(engine: BackupEngine) -> Self {
        Self {
            engine,
            started: Instant::now(),
        }
    }
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/backups", backups::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
