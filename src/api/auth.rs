//! Authentication endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{LoginRequest, Role, UserShort},
};

use super::AuthenticatedUser;

/// Login response with bearer token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub user: UserShort,
}

/// Current-user response
#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub id: i32,
    pub email: String,
    pub role: Role,
    /// Whether the user holds a support-agent record
    pub is_agent: bool,
}

/// Authenticate and obtain a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (token, user) = state
        .services
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        user: UserShort {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    }))
}

/// Introspect the current token
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current principal", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MeResponse>> {
    let principal = state.services.access.resolve_principal(&claims).await?;
    Ok(Json(MeResponse {
        id: principal.user_id,
        email: claims.sub,
        role: principal.role,
        is_agent: principal.is_agent(),
    }))
}
