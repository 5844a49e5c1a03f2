//! Authentication handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::IdentityClaim;
use crate::web::dto::{ApiResponse, LoginResponse, UserInfo, VerifyResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// POST /api/auth/login - Exchange an identity claim for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(claim): Json<IdentityClaim>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let session = state.gate.login(state.drive.store(), &claim).await?;

    Ok(Json(ApiResponse::new(LoginResponse {
        access_token: session.token,
        token_type: "Bearer",
        expires_in: state.gate.issuer().ttl_secs(),
        user: UserInfo::from(&session.user),
        first_login: session.first_login,
    })))
}

/// GET /api/auth/verify - Check the bearer token and return its user.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<VerifyResponse>>, ApiError> {
    let user = state
        .drive
        .store()
        .read(|doc| doc.user(auth.user_id()).cloned())
        .await
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

    Ok(Json(ApiResponse::new(VerifyResponse {
        valid: true,
        user: UserInfo::from(&user),
    })))
}
