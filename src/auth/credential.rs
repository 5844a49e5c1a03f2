//! Bearer credentials.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::identity::UserIdentity;
use crate::config::AuthConfig;
use crate::{DriveError, Result};

/// Longest validity a credential may have.
pub const MAX_TOKEN_TTL_DAYS: u64 = 30;

/// JWT claims carried by a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject (user ID).
    pub sub: i64,
    pub username: String,
    pub first_name: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct CredentialIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl CredentialIssuer {
    /// `ttl_days` is clamped to `1..=MAX_TOKEN_TTL_DAYS`.
    pub fn new(secret: &str, ttl_days: u64) -> Self {
        let ttl_days = ttl_days.clamp(1, MAX_TOKEN_TTL_DAYS);
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs: ttl_days * 24 * 60 * 60,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_days)
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a credential for `identity`.
    pub fn issue(&self, identity: &UserIdentity) -> Result<String> {
        self.issue_at(identity, Utc::now().timestamp().max(0) as u64)
    }

    fn issue_at(&self, identity: &UserIdentity, issued_at: u64) -> Result<String> {
        let claims = CredentialClaims {
            sub: identity.id,
            username: identity.username.clone(),
            first_name: identity.first_name.clone(),
            iat: issued_at,
            exp: issued_at + self.ttl_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            DriveError::Internal(format!("failed to issue credential: {e}"))
        })
    }

    /// Decode `token`, failing with `Unauthorized` if it is invalid or expired.
    pub fn verify(&self, token: &str) -> Result<CredentialClaims> {
        decode::<CredentialClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                DriveError::Unauthorized("invalid or expired token".to_string())
            })
    }
}
