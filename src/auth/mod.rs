//! Authentication module for msgdrive.
//!
//! This module provides identity claim verification, bearer credential
//! issuing, and the login gate that ties them to user records.

mod credential;
mod gate;
mod identity;

pub use credential::{CredentialClaims, CredentialIssuer, MAX_TOKEN_TTL_DAYS};
pub use gate::{IdentityGate, Session};
pub use identity::{ClaimVerifier, IdentityClaim, IdentityVerifier, UserIdentity};
