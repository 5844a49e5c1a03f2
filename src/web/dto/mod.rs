//! Data transfer objects for the HTTP surface.

mod request;
mod response;

pub use request::*;
pub use response::*;
