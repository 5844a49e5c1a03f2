//! File handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::drive::UploadRequest;
use crate::web::dto::{
    file_list, ApiResponse, BinResponse, BulkRequest, BulkResponse, CancelResponse, CopyRequest,
    EmptyBinResponse, FileResponse, FolderQuery, MoveRequest, PurgeResponse, RenameRequest,
    SearchQuery, StarResponse, VersionResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Header set on downloads whose bytes could not be fetched.
pub const PLACEHOLDER_HEADER: &str = "x-msgdrive-placeholder";

/// Content-Disposition value for `filename`.
///
/// Control characters are dropped so the name cannot break the header, and
/// non-ASCII names get an RFC 5987 `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if fallback == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

/// POST /api/upload - Multipart upload (`file`, optional `folder_id`, `upload_id`).
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let mut request = UploadRequest::default();
    let mut has_file = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large("File too large")
        } else {
            ApiError::bad_request("Invalid multipart data")
        }
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                request.name = field.file_name().map(|s| s.to_string());
                request.mime_type = field.content_type().map(|s| s.to_string());
                request.content = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        tracing::warn!("Failed to read file content: {}", e);
                        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                            ApiError::payload_too_large("File too large")
                        } else {
                            ApiError::bad_request("Failed to read file")
                        }
                    })?
                    .to_vec();
                has_file = true;
            }
            "folder_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid folder_id"))?;
                let text = text.trim();
                if !text.is_empty() {
                    request.folder_id = text
                        .parse()
                        .map_err(|_| ApiError::bad_request("Invalid folder_id"))?;
                }
            }
            "upload_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid upload_id"))?;
                let text = text.trim();
                if !text.is_empty() {
                    request.upload_id = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    if !has_file {
        return Err(ApiError::bad_request("No file provided"));
    }

    let limit = state.drive.settings().max_upload_bytes;
    if request.content.len() as u64 > limit {
        return Err(ApiError::payload_too_large(format!(
            "File too large (max {}MB)",
            limit / 1024 / 1024
        )));
    }

    let file = state.drive.upload(auth.user_id(), request).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// POST /api/upload/cancel/:upload_id - Mark an upload as cancelled.
pub async fn cancel_upload(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(upload_id): Path<String>,
) -> Json<ApiResponse<CancelResponse>> {
    state.drive.cancel_upload(&upload_id);
    Json(ApiResponse::new(CancelResponse {
        upload_id,
        cancelled: true,
    }))
}

/// GET /api/files?folder_id= - ACTIVE files of a folder (root by default).
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<FolderQuery>,
) -> Json<ApiResponse<Vec<FileResponse>>> {
    let files = state.drive.list_files(query.folder_id).await;
    Json(ApiResponse::new(file_list(&files)))
}

/// GET /api/files/all - Every file record.
pub async fn list_all_files(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Json<ApiResponse<Vec<FileResponse>>> {
    let files = state.drive.list_all_files().await;
    Json(ApiResponse::new(file_list(&files)))
}

/// GET /api/files/bin - Binned files and folders.
pub async fn list_bin(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Json<ApiResponse<BinResponse>> {
    let bin = state.drive.list_bin().await;
    Json(ApiResponse::new(BinResponse::from(bin)))
}

/// GET /api/files/starred
pub async fn list_starred(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Json<ApiResponse<Vec<FileResponse>>> {
    let files = state.drive.list_starred().await;
    Json(ApiResponse::new(file_list(&files)))
}

/// GET /api/files/recent
pub async fn list_recent(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Json<ApiResponse<Vec<FileResponse>>> {
    let files = state.drive.list_recent().await;
    Json(ApiResponse::new(file_list(&files)))
}

/// GET /api/files/search?query=
pub async fn search_files(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.drive.search(&query.query).await?;
    Ok(Json(ApiResponse::new(file_list(&files))))
}

/// POST /api/files/bulk
pub async fn bulk_files(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<BulkRequest>,
) -> Result<Json<ApiResponse<BulkResponse>>, ApiError> {
    let results = state
        .drive
        .bulk(
            auth.user_id(),
            req.operation,
            &req.file_ids,
            req.target_folder_id,
        )
        .await?;
    Ok(Json(ApiResponse::new(BulkResponse::from(results))))
}

/// POST /api/files/:id/star - Toggle the star.
pub async fn toggle_star(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<StarResponse>>, ApiError> {
    let file = state.drive.toggle_star(id).await?;
    Ok(Json(ApiResponse::new(StarResponse {
        file_id: file.id,
        starred: file.starred,
    })))
}

/// POST /api/files/:id/rename
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.drive.rename(id, &req.name).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// POST /api/files/:id/move
pub async fn move_file(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.drive.move_file(id, req.folder_id).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// POST /api/files/:id/copy
pub async fn copy_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<u64>,
    Json(req): Json<CopyRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let folder_id = match req.folder_id {
        Some(folder_id) => folder_id,
        None => state.drive.get_file(id).await?.folder_id,
    };
    let copy = state
        .drive
        .copy_file(auth.user_id(), id, folder_id, req.name.as_deref())
        .await?;
    Ok(Json(ApiResponse::new(FileResponse::from(copy))))
}

/// POST /api/files/:id/restore - Take a file out of the bin.
pub async fn restore_file(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.drive.restore_file(id).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// GET /api/files/:id/versions
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Vec<VersionResponse>>>, ApiError> {
    let versions = state.drive.versions(id).await?;
    Ok(Json(ApiResponse::new(
        versions.iter().map(VersionResponse::from).collect(),
    )))
}

/// POST /api/files/:id/versions/:version/restore
pub async fn restore_version(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path((id, version)): Path<(u64, u32)>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.drive.restore_version(id, version).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// DELETE /api/files/:id - Move a file to the bin.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.drive.delete_file(id).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// DELETE /api/files/:id/permanent - Purge a binned file.
pub async fn purge_file(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<PurgeResponse>>, ApiError> {
    let file = state.drive.purge_file(id).await?;
    Ok(Json(ApiResponse::new(PurgeResponse { file_id: file.id })))
}

/// DELETE /api/bin - Purge everything in the bin.
pub async fn empty_bin(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<ApiResponse<EmptyBinResponse>>, ApiError> {
    let removed = state.drive.empty_bin().await?;
    Ok(Json(ApiResponse::new(EmptyBinResponse { removed })))
}

/// GET /api/download/:id - File bytes.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let download = state.drive.download(id).await?;

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, download.mime_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&download.file.name),
        )
        .header(header::CONTENT_LENGTH, download.content.len());
    if download.placeholder {
        builder = builder.header(PLACEHOLDER_HEADER, "true");
    }

    builder.body(Body::from(download.content)).map_err(|e| {
        tracing::error!("Failed to build response: {}", e);
        ApiError::internal("Failed to build response")
    })
}
