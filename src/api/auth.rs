use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tower_sessions::Session;

use super::validation::validate_login_fields;
use super::{ApiError, ApiResponse, AppState, IdentityDto, MessageResponse, UserDto};
use crate::services::Identity;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Identity resolution
// ============================================================================

/// Resolves the session identity once per request and stores it in the
/// request extensions, where handlers pick it up as an [`Identity`] argument.
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = state.sessions().restore(&session).await;

    if let Identity::Authenticated(user) = &identity {
        tracing::Span::current().record("user_id", user.id);
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth_service()
        .register(&payload.username, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// POST /auth/login
/// Authenticate with username and password and bind the session to the user
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<IdentityDto>>, ApiError> {
    validate_login_fields(&payload.username, &payload.password)?;

    let user = state
        .sessions()
        .login(&session, &payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(IdentityDto {
        authenticated: true,
        user: Some(user),
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.sessions().logout(&session).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

/// GET /auth/me
pub async fn me(identity: Identity) -> Json<ApiResponse<IdentityDto>> {
    let user = identity.user().cloned();

    Json(ApiResponse::success(IdentityDto {
        authenticated: user.is_some(),
        user,
    }))
}
