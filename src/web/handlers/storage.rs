//! Storage usage handler.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::drive::StorageInfo;
use crate::web::dto::ApiResponse;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/storage/info - Bytes and file count of ACTIVE files.
pub async fn storage_info(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Json<ApiResponse<StorageInfo>> {
    Json(ApiResponse::new(state.drive.storage_info().await))
}
