//! Metadata storage for msgdrive.
//!
//! This module provides:
//! - The record types (users, folders, files, versions) and their states
//! - Whole-document JSON persistence with atomic replace
//! - The process-wide [`MetadataStore`] with serialized transactions

pub mod document;
mod metadata;
mod model;

pub use metadata::MetadataStore;
pub use model::{
    File, FileState, Folder, FolderState, Metadata, StorageMode, User, Version, ROOT_FOLDER_ID,
};
