//! Identity claims from the external login provider.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{DriveError, Result};

/// Assertion handed over by the login widget.
///
/// Fields are optional so a missing one can be reported as such rather than
/// as a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Unix time at which the provider issued the claim.
    pub auth_date: Option<i64>,
}

/// Identity established from a verified claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Turns a claim into an identity, or rejects it.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, claim: &IdentityClaim) -> Result<UserIdentity>;
}

/// Accepts claims whose required fields are present and that are fresh enough.
///
/// The provider signature is checked upstream; this only guards the shape
/// and the age of what arrives.
#[derive(Debug, Clone)]
pub struct ClaimVerifier {
    max_age: Duration,
    max_skew: Duration,
}

impl ClaimVerifier {
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            max_age: Duration::seconds(max_age_secs),
            max_skew: Duration::seconds(60),
        }
    }

    pub fn verify_at(&self, claim: &IdentityClaim, now: DateTime<Utc>) -> Result<UserIdentity> {
        let id = claim.id.ok_or_else(|| rejected("missing field: id"))?;
        let first_name = claim
            .first_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| rejected("missing field: first_name"))?;
        let auth_date = claim
            .auth_date
            .ok_or_else(|| rejected("missing field: auth_date"))?;

        let issued_at = Utc
            .timestamp_opt(auth_date, 0)
            .single()
            .ok_or_else(|| rejected("auth_date out of range"))?;
        if now - issued_at > self.max_age {
            return Err(rejected("authentication data expired"));
        }
        if issued_at - now > self.max_skew {
            return Err(rejected("auth_date is in the future"));
        }

        Ok(UserIdentity {
            id,
            username: claim.username.clone().unwrap_or_default(),
            first_name: first_name.to_string(),
            last_name: claim.last_name.clone().unwrap_or_default(),
        })
    }
}

impl IdentityVerifier for ClaimVerifier {
    fn verify(&self, claim: &IdentityClaim) -> Result<UserIdentity> {
        self.verify_at(claim, Utc::now())
    }
}

fn rejected(reason: &str) -> DriveError {
    tracing::debug!("Identity claim rejected: {}", reason);
    DriveError::Unauthorized(reason.to_string())
}
