//! HTTP surface of the drive.
//!
//! A thin axum adapter: handlers translate requests into [`crate::Drive`]
//! calls and map [`crate::DriveError`] onto status codes.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
