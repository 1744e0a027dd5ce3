//! Notification endpoints
//!
//! Real-time delivery happens over the WebSocket; these routes cover the
//! initial page load and clients without an open socket.

use axum::{
    extract::{Path, State},
    Json,
};
use crate::{error::AppResult, models::notification::Notification};

use super::tickets::StatusResponse;
use super::AuthenticatedUser;

/// List the authenticated user's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications for the current user", body = Vec<Notification>),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state.services.notifications.list(claims.user_id).await?;
    Ok(Json(notifications))
}

/// Mark a single notification as read
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read", body = StatusResponse)
    )
)]
pub async fn mark_notification_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<StatusResponse>> {
    state
        .services
        .notifications
        .mark_read(id, claims.user_id)
        .await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Notificación marcada como leída".to_string(),
    }))
}

/// Mark all of the user's notifications as read
#[utoipa::path(
    put,
    path = "/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All marked as read", body = StatusResponse)
    )
)]
pub async fn mark_all_notifications_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatusResponse>> {
    state
        .services
        .notifications
        .mark_all_read(claims.user_id)
        .await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Todas las notificaciones marcadas como leídas".to_string(),
    }))
}
