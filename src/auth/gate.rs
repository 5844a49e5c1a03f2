//! Login: verified claim → user record → bearer credential.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::credential::CredentialIssuer;
use super::identity::{ClaimVerifier, IdentityClaim, IdentityVerifier, UserIdentity};
use crate::config::AuthConfig;
use crate::store::{Metadata, MetadataStore, User};
use crate::Result;

/// A successful login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    /// The user record was created by this login.
    pub first_login: bool,
}

/// Front door of the drive.
pub struct IdentityGate {
    verifier: Box<dyn IdentityVerifier>,
    issuer: Arc<CredentialIssuer>,
}

impl IdentityGate {
    pub fn new(verifier: impl IdentityVerifier + 'static, issuer: Arc<CredentialIssuer>) -> Self {
        Self {
            verifier: Box::new(verifier),
            issuer,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            ClaimVerifier::new(config.max_claim_age_secs),
            Arc::new(CredentialIssuer::from_config(config)),
        )
    }

    pub fn issuer(&self) -> &Arc<CredentialIssuer> {
        &self.issuer
    }

    /// Verify `claim`, create or refresh its user record, and issue a credential.
    ///
    /// Name fields are refreshed on every login; the id and creation time
    /// never change.
    pub async fn login(&self, store: &MetadataStore, claim: &IdentityClaim) -> Result<Session> {
        let identity = self.verifier.verify(claim)?;
        let (user, first_login) = store.transact(|doc| Ok(upsert_user(doc, &identity))).await?;
        let token = self.issuer.issue(&identity)?;

        if first_login {
            tracing::info!("New user {} ({}) registered", user.id, user.first_name);
        } else {
            tracing::info!("User {} ({}) logged in", user.id, user.first_name);
        }

        Ok(Session {
            token,
            user,
            first_login,
        })
    }
}

fn upsert_user(doc: &mut Metadata, identity: &UserIdentity) -> (User, bool) {
    if let Some(user) = doc.users.iter_mut().find(|u| u.id == identity.id) {
        user.username = identity.username.clone();
        user.first_name = identity.first_name.clone();
        user.last_name = identity.last_name.clone();
        return (user.clone(), false);
    }

    let user = User {
        id: identity.id,
        username: identity.username.clone(),
        first_name: identity.first_name.clone(),
        last_name: identity.last_name.clone(),
        created_at: Utc::now(),
    };
    doc.users.push(user.clone());
    (user, true)
}
