//! Folder handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::web::dto::{
    ApiResponse, CreateFolderRequest, FolderDeletionResponse, FolderResponse, ParentQuery,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/folders?parent_id= - ACTIVE child folders (root by default).
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<ParentQuery>,
) -> Json<ApiResponse<Vec<FolderResponse>>> {
    let folders = state.drive.list_folders(query.parent_id).await;
    Json(ApiResponse::new(
        folders.iter().map(FolderResponse::from).collect(),
    ))
}

/// POST /api/folders
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = state
        .drive
        .create_folder(auth.user_id(), &req.name, req.parent_id)
        .await?;
    Ok(Json(ApiResponse::new(FolderResponse::from(&folder))))
}

/// DELETE /api/folders/:id - Bin a folder and its contents.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<FolderDeletionResponse>>, ApiError> {
    let deletion = state.drive.delete_folder(id).await?;
    Ok(Json(ApiResponse::new(FolderDeletionResponse::from(deletion))))
}
