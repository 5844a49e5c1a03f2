//! Bearer authentication middleware.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{CredentialClaims, CredentialIssuer};
use crate::web::error::ApiError;

/// Extractor for authenticated users.
///
/// The token comes from the `Authorization: Bearer` header, or from a
/// `token` query parameter so that plain download links work.
#[derive(Debug, Clone)]
pub struct AuthUser(pub CredentialClaims);

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.0.sub
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = bearer_token(parts)
                .or_else(|| query_token(parts))
                .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

            // Issuer is placed in extensions by `credential_auth`
            let issuer = parts
                .extensions
                .get::<Arc<CredentialIssuer>>()
                .ok_or_else(|| ApiError::internal("Credential issuer not configured"))?;

            let claims = issuer
                .verify(&token)
                .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;
            Ok(AuthUser(claims))
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn query_token(parts: &Parts) -> Option<String> {
    parts.uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}

/// Middleware function to inject the credential issuer into request extensions.
pub async fn credential_auth(
    issuer: Arc<CredentialIssuer>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(issuer);
    next.run(request).await
}
