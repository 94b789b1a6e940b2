//! Health check endpoint.

use super::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let ctx = state.engine.context();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": ctx.source.engine_name(),
        "backupDir": ctx.backup_dir.display().to_string(),
        "retention": ctx.retention.policy(),
        "uptimeSecs": state.started.elapsed().as_secs(),
    }))
}
