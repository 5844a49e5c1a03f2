//! Response DTOs.
//!
//! Records are reshaped for clients: lifecycle state becomes a `status`
//! string and blob references are never exposed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::drive::{Bin, BulkItem, FolderDeletion};
use crate::store::{File, Folder, StorageMode, User, Version};

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResponse {
    pub id: u64,
    pub name: String,
    pub folder_id: u64,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
    /// `active` or `deleted`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
    pub starred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_at: Option<DateTime<Utc>>,
    pub version_count: usize,
}

impl From<&File> for FileResponse {
    fn from(file: &File) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            folder_id: file.folder_id,
            size: file.size,
            mime_type: file.mime_type.clone(),
            uploaded_by: file.uploaded_by,
            created_at: file.created_at,
            status: if file.is_active() { "active" } else { "deleted" },
            deleted_at: file.deleted_at(),
            restored_at: file.restored_at(),
            starred: file.starred,
            moved_at: file.moved_at,
            version_count: file.versions.len(),
        }
    }
}

impl From<File> for FileResponse {
    fn from(file: File) -> Self {
        Self::from(&file)
    }
}

pub fn file_list(files: &[File]) -> Vec<FileResponse> {
    files.iter().map(FileResponse::from).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderResponse {
    pub id: u64,
    pub name: String,
    pub parent_id: u64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub storage: StorageMode,
}

impl From<&Folder> for FolderResponse {
    fn from(folder: &Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name.clone(),
            parent_id: folder.parent_id,
            created_by: folder.created_by,
            created_at: folder.created_at,
            status: if folder.is_active() { "active" } else { "deleted" },
            deleted_at: folder.deleted_at(),
            storage: folder.storage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: u64,
    pub user: UserInfo,
    pub first_login: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct StarResponse {
    pub file_id: u64,
    pub starred: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub upload_id: String,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct BinResponse {
    pub files: Vec<FileResponse>,
    pub folders: Vec<FolderResponse>,
}

impl From<Bin> for BinResponse {
    fn from(bin: Bin) -> Self {
        Self {
            files: file_list(&bin.files),
            folders: bin.folders.iter().map(FolderResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version_number: u32,
    pub previous_name: String,
    pub captured_at: DateTime<Utc>,
}

impl From<&Version> for VersionResponse {
    fn from(version: &Version) -> Self {
        Self {
            version_number: version.version_number,
            previous_name: version.previous_name.clone(),
            captured_at: version.captured_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub results: Vec<BulkItem>,
    pub succeeded: usize,
    pub failed: usize,
}

impl From<Vec<BulkItem>> for BulkResponse {
    fn from(results: Vec<BulkItem>) -> Self {
        let succeeded = results.iter().filter(|i| i.outcome.is_ok()).count();
        Self {
            failed: results.len() - succeeded,
            succeeded,
            results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub file_id: u64,
}

#[derive(Debug, Serialize)]
pub struct EmptyBinResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct FolderDeletionResponse {
    pub folder: FolderResponse,
    pub folders_deleted: usize,
    pub files_deleted: usize,
    pub containers_released: usize,
}

impl From<FolderDeletion> for FolderDeletionResponse {
    fn from(deletion: FolderDeletion) -> Self {
        Self {
            folder: FolderResponse::from(&deletion.folder),
            folders_deleted: deletion.folders_deleted,
            files_deleted: deletion.files_deleted,
            containers_released: deletion.containers_released,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobRef, ContainerHandle, ObjectRef};
    use crate::store::FileState;

    #[test]
    fn test_file_response_hides_blob() {
        let mut file = File {
            id: 1,
            name: "a.txt".to_string(),
            folder_id: 0,
            size: 1,
            mime_type: "text/plain".to_string(),
            blob: BlobRef {
                container: ContainerHandle("c".to_string()),
                object: ObjectRef("o".to_string()),
            },
            uploaded_by: 2,
            created_at: Utc::now(),
            state: FileState::Active { restored_at: None },
            starred: false,
            moved_at: None,
            versions: Vec::new(),
        };

        let json = serde_json::to_value(FileResponse::from(&file)).unwrap();
        assert_eq!(json["status"], "active");
        assert!(json.get("blob").is_none());
        assert!(json.get("deleted_at").is_none());

        file.soft_delete(Utc::now()).unwrap();
        let json = serde_json::to_value(FileResponse::from(&file)).unwrap();
        assert_eq!(json["status"], "deleted");
        assert!(json["deleted_at"].is_string());
    }
}
