//! Error types for msgdrive.

use thiserror::Error;

/// Coarse error classes shared by every layer.
///
/// Transports map these onto their own status codes; the engine only needs to
/// know which class a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Record absent, or present but in the wrong state for the operation.
    NotFound,
    /// Empty name, missing field, oversized payload.
    InvalidInput,
    /// The blob store could not complete a call.
    StorageUnavailable,
    /// The metadata document could not be written.
    PersistenceFailure,
    /// Missing or invalid credential.
    Unauthorized,
    /// The caller cancelled the operation.
    Cancelled,
    /// Anything else.
    Internal,
}

/// Common error type for msgdrive.
#[derive(Error, Debug)]
pub enum DriveError {
    /// No ACTIVE file with this id.
    #[error("file {0} not found")]
    FileNotFound(u64),

    /// No binned file with this id.
    #[error("file {0} not found in bin")]
    FileNotFoundInBin(u64),

    /// No ACTIVE folder with this id.
    #[error("folder {0} not found")]
    FolderNotFound(u64),

    /// The file has no version with this number.
    #[error("version {version} of file {file_id} not found")]
    VersionNotFound { file_id: u64, version: u32 },

    /// The container holding the file's bytes was deleted.
    #[error("bytes of file {0} are no longer stored")]
    BytesLost(u64),

    /// A file or folder name was rejected.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Any other rejected input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Blob store call failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Metadata or container document could not be saved.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Authentication error.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The upload was cancelled before its metadata was committed.
    #[error("upload {0} cancelled")]
    UploadCancelled(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DriveError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::FileNotFound(_)
            | DriveError::FileNotFoundInBin(_)
            | DriveError::FolderNotFound(_)
            | DriveError::VersionNotFound { .. }
            | DriveError::BytesLost(_) => ErrorKind::NotFound,
            DriveError::InvalidName(_) | DriveError::InvalidInput(_) => ErrorKind::InvalidInput,
            DriveError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            DriveError::Persistence(_) => ErrorKind::PersistenceFailure,
            DriveError::Unauthorized(_) => ErrorKind::Unauthorized,
            DriveError::UploadCancelled(_) => ErrorKind::Cancelled,
            DriveError::Io(_) | DriveError::Config(_) | DriveError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::StorageUnavailable | ErrorKind::PersistenceFailure
        )
    }
}

impl From<crate::blob::BlobError> for DriveError {
    fn from(e: crate::blob::BlobError) -> Self {
        DriveError::StorageUnavailable(e.to_string())
    }
}

/// Result type alias for msgdrive operations.
pub type Result<T> = std::result::Result<T, DriveError>;
