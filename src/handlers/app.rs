use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::services::FileService;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub sessions: bool,
    pub db: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub files: u64,
}

/// Readiness of the backing stores
/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        sessions: state.sessions.is_alive(),
        db: state.docs.is_alive(),
    })
}

/// Record counts
/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    if !state.docs.is_alive() {
        return Err(AppError::ServiceUnavailable);
    }
    let files = FileService::count_files(state.docs.as_ref()).await?;
    Ok(Json(StatsResponse { files }))
}
