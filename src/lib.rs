//! msgdrive - a cloud drive on top of a messaging platform
//!
//! Files and folders live in a metadata document; file bytes live in
//! containers of a pluggable blob store.

pub mod auth;
pub mod blob;
pub mod config;
pub mod container;
pub mod drive;
pub mod error;
pub mod logging;
pub mod store;
pub mod web;

pub use auth::{CredentialIssuer, IdentityClaim, IdentityGate, Session};
pub use blob::{BlobStore, LocalBlobStore, MemoryBlobStore, NullBlobStore};
pub use config::Config;
pub use drive::{Drive, DriveSettings, UploadRequest};
pub use error::{DriveError, ErrorKind, Result};
pub use store::{File, FileState, Folder, MetadataStore, User};
pub use web::WebServer;
