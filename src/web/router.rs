//! Router configuration for the Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    bulk_files, cancel_upload, copy_file, create_folder, delete_file, delete_folder,
    download_file, empty_bin, list_all_files, list_bin, list_files, list_folders, list_recent,
    list_starred, list_versions, login, move_file, purge_file, rename_file, restore_file,
    restore_version, search_files, storage_info, toggle_star, upload_file, verify, AppState,
};
use super::middleware::{create_cors_layer, credential_auth};
use crate::auth::CredentialIssuer;

/// Multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    issuer: Arc<CredentialIssuer>,
    cors_origins: &[String],
    max_upload_bytes: u64,
) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(login))
        .route("/verify", get(verify));

    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let upload_routes = Router::new()
        .route("/", post(upload_file))
        .route("/cancel/:upload_id", post(cancel_upload))
        .layer(DefaultBodyLimit::max(body_limit));

    let file_routes = Router::new()
        .route("/", get(list_files))
        .route("/all", get(list_all_files))
        .route("/bin", get(list_bin))
        .route("/starred", get(list_starred))
        .route("/recent", get(list_recent))
        .route("/search", get(search_files))
        .route("/bulk", post(bulk_files))
        .route("/:id", delete(delete_file))
        .route("/:id/permanent", delete(purge_file))
        .route("/:id/star", post(toggle_star))
        .route("/:id/rename", post(rename_file))
        .route("/:id/move", post(move_file))
        .route("/:id/copy", post(copy_file))
        .route("/:id/restore", post(restore_file))
        .route("/:id/versions", get(list_versions))
        .route("/:id/versions/:version/restore", post(restore_version));

    let folder_routes = Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route("/:id", delete(delete_folder));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/upload", upload_routes)
        .nest("/files", file_routes)
        .nest("/folders", folder_routes)
        .route("/bin", delete(empty_bin))
        .route("/download/:id", get(download_file))
        .route("/storage/info", get(storage_info));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let issuer = issuer.clone();
                    credential_auth(issuer, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}
