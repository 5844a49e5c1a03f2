//! API handlers.

pub mod auth;
pub mod file;
pub mod folder;
pub mod storage;

pub use auth::*;
pub use file::*;
pub use folder::*;
pub use storage::*;

use std::sync::Arc;

use crate::auth::IdentityGate;
use crate::drive::Drive;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub drive: Arc<Drive>,
    pub gate: Arc<IdentityGate>,
}

impl AppState {
    pub fn new(drive: Arc<Drive>, gate: Arc<IdentityGate>) -> Self {
        Self { drive, gate }
    }
}
