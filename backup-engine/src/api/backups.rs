//! Backup management endpoints.

use super::error::AppError;
use super::AppState;
use crate::models::{BackupMetadata, BackupResult, Cadence, RestoreResult};
use crate::retention::RotationReport;
use crate::utils::BackupError;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_backups).post(create_backup))
        .route("/rotate", post(rotate_backups))
        .route("/{filename}", delete(delete_backup))
        .route("/{filename}/verify", get(verify_backup))
        .route("/{filename}/restore", post(restore_backup))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateBackupRequest {
    #[serde(default)]
    pub cadence: Option<Cadence>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RotateRequest {
    #[serde(default)]
    pub cadence: Option<Cadence>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub filename: String,
    pub verified: bool,
}

/// Request bodies are optional; an empty body means all defaults.
fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

fn status_for(success: bool, error: Option<&BackupError>) -> StatusCode {
    match (success, error) {
        (true, _) => StatusCode::OK,
        (false, Some(BackupError::NotFound(_))) => StatusCode::NOT_FOUND,
        (false, Some(BackupError::Integrity(_))) => StatusCode::UNPROCESSABLE_ENTITY,
        (false, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// GET /api/backups
async fn list_backups(State(state): State<AppState>) -> Result<Json<Vec<BackupMetadata>>, AppError> {
    Ok(Json(state.engine.list().await?))
}

/// POST /api/backups - body `{"cadence": "..."}`, manual when omitted
async fn create_backup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<BackupResult>), AppError> {
    let req: CreateBackupRequest = optional_json(&body)?;
    let cadence = req.cadence.unwrap_or(Cadence::Manual);
    tracing::info!(cadence = %cadence, "Backup requested via API");

    let result = state.engine.create(cadence).await;
    Ok((status_for(result.success, result.error.as_ref()), Json(result)))
}

/// GET /api/backups/{filename}/verify
async fn verify_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<VerifyResponse>, AppError> {
    let verified = state.engine.verify(&filename).await?;
    Ok(Json(VerifyResponse { filename, verified }))
}

/// POST /api/backups/{filename}/restore
async fn restore_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> (StatusCode, Json<RestoreResult>) {
    tracing::info!("Restore of {} requested via API", filename);
    let result = state.engine.restore(&filename).await;
    (status_for(result.success, result.error.as_ref()), Json(result))
}

/// DELETE /api/backups/{filename}
async fn delete_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.delete(&filename).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/backups/rotate
async fn rotate_backups(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RotationReport>, AppError> {
    let req: RotateRequest = optional_json(&body)?;
    Ok(Json(state.engine.rotate(req.cadence).await))
}
