//! Request DTOs.

use serde::Deserialize;

use crate::drive::BulkOp;

/// Body of `POST /api/files/:id/rename`.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Body of `POST /api/files/:id/move`.
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub folder_id: u64,
}

/// Body of `POST /api/files/:id/copy`.
#[derive(Debug, Default, Deserialize)]
pub struct CopyRequest {
    /// Target folder; defaults to the folder of the source file.
    #[serde(default)]
    pub folder_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `POST /api/files/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub operation: BulkOp,
    pub file_ids: Vec<u64>,
    #[serde(default)]
    pub target_folder_id: Option<u64>,
}

/// Body of `POST /api/folders`.
#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: u64,
}

/// Query of `GET /api/files`.
#[derive(Debug, Default, Deserialize)]
pub struct FolderQuery {
    #[serde(default)]
    pub folder_id: u64,
}

/// Query of `GET /api/folders`.
#[derive(Debug, Default, Deserialize)]
pub struct ParentQuery {
    #[serde(default)]
    pub parent_id: u64,
}

/// Query of `GET /api/files/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}
