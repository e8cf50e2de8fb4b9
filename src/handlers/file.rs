use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::error::{ApiJson, ApiQuery, Result};
use crate::models::{CurrentUser, FileQuery, FileRecord, ParentId, UploadRequest};
use crate::services::FileService;
use crate::AppState;

/// Upload a file, image or folder
/// POST /files
pub async fn post_upload(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UploadRequest>,
) -> Result<(StatusCode, Json<FileRecord>)> {
    let file = FileService::upload(
        state.docs.as_ref(),
        state.blobs.as_ref(),
        &current_user.id,
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// Get a specific file
/// GET /files/:id
pub async fn get_show(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>> {
    let file = FileService::show(state.docs.as_ref(), &current_user.id, &id).await?;
    Ok(Json(file))
}

/// List files in a folder, 20 per page
/// GET /files?parentId=xxx&page=n
pub async fn get_index(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<FileQuery>,
) -> Result<Json<Vec<FileRecord>>> {
    let parent_id = query
        .parent_id
        .as_deref()
        .map(ParentId::from_raw)
        .unwrap_or_default();
    let files = FileService::list(
        state.docs.as_ref(),
        &current_user.id,
        parent_id,
        query.page.unwrap_or(0),
    )
    .await?;
    Ok(Json(files))
}
