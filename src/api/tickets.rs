//! Support ticket endpoints
//!
//! The read endpoints consult the same access evaluator the real-time
//! gateway uses for room joins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        message::MessageView,
        ticket::{AssignTicket, CreateTicket, Ticket, TicketSummary, UpdateTicketStatus},
        user::Principal,
    },
};

use super::AuthenticatedUser;

/// Ticket creation response
#[derive(Serialize, ToSchema)]
pub struct CreateTicketResponse {
    pub message: String,
    pub ticket: Ticket,
}

/// Generic status response
#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

async fn resolve(
    state: &crate::AppState,
    claims: &crate::models::user::UserClaims,
) -> AppResult<Principal> {
    state.services.access.resolve_principal(claims).await
}

fn require_staff(principal: &Principal) -> AppResult<()> {
    if principal.is_support_staff() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Se requiere agente o administrador".to_string(),
        ))
    }
}

/// Open a support ticket with its initial message
#[utoipa::path(
    post,
    path = "/support/tickets",
    tag = "support",
    security(("bearer_auth" = [])),
    request_body = CreateTicket,
    responses(
        (status = 201, description = "Ticket created", body = CreateTicketResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_ticket(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateTicket>,
) -> AppResult<(StatusCode, Json<CreateTicketResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let ticket = state
        .services
        .tickets
        .create(claims.user_id, &request.asunto, &request.mensaje)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            message: "Ticket creado exitosamente".to_string(),
            ticket,
        }),
    ))
}

/// List the caller's own tickets
#[utoipa::path(
    get,
    path = "/support/tickets/my",
    tag = "support",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's tickets", body = Vec<TicketSummary>)
    )
)]
pub async fn my_tickets(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<TicketSummary>>> {
    let tickets = state.services.tickets.list_own(claims.user_id).await?;
    Ok(Json(tickets))
}

/// Staff queue: agents see their own plus unassigned tickets, admins see all
#[utoipa::path(
    get,
    path = "/support/tickets",
    tag = "support",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ticket queue", body = Vec<TicketSummary>),
        (status = 403, description = "Not support staff")
    )
)]
pub async fn all_tickets(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<TicketSummary>>> {
    let principal = resolve(&state, &claims).await?;
    let tickets = state.services.tickets.list_queue(&principal).await?;
    Ok(Json(tickets))
}

/// Read a ticket's message stream
#[utoipa::path(
    get,
    path = "/support/tickets/{id}/messages",
    tag = "support",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Messages in persistence order", body = Vec<MessageView>),
        (status = 403, description = "No access to this ticket"),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn ticket_messages(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(ticket_id): Path<i32>,
) -> AppResult<Json<Vec<MessageView>>> {
    let principal = resolve(&state, &claims).await?;
    let messages = state.services.tickets.messages(&principal, ticket_id).await?;
    Ok(Json(messages))
}

/// Close a ticket (owner or staff)
#[utoipa::path(
    put,
    path = "/support/tickets/{id}/close",
    tag = "support",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket closed", body = StatusResponse),
        (status = 403, description = "No access to this ticket"),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn close_ticket(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(ticket_id): Path<i32>,
) -> AppResult<Json<StatusResponse>> {
    let principal = resolve(&state, &claims).await?;
    state.services.tickets.close(&principal, ticket_id).await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Ticket cerrado exitosamente".to_string(),
    }))
}

/// Explicitly change a ticket's state (staff only)
#[utoipa::path(
    put,
    path = "/support/tickets/{id}/status",
    tag = "support",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    request_body = UpdateTicketStatus,
    responses(
        (status = 200, description = "State updated", body = StatusResponse),
        (status = 400, description = "Invalid state"),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn update_ticket_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(ticket_id): Path<i32>,
    Json(request): Json<UpdateTicketStatus>,
) -> AppResult<Json<StatusResponse>> {
    let principal = resolve(&state, &claims).await?;
    require_staff(&principal)?;
    state.services.tickets.set_status(ticket_id, request.estado).await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Estado del ticket actualizado exitosamente".to_string(),
    }))
}

/// Assign a ticket to an agent (staff only)
#[utoipa::path(
    put,
    path = "/support/tickets/{id}/assign",
    tag = "support",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    request_body = AssignTicket,
    responses(
        (status = 200, description = "Ticket assigned", body = StatusResponse),
        (status = 404, description = "Ticket or agent not found"),
        (status = 409, description = "Ticket is closed")
    )
)]
pub async fn assign_ticket(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(ticket_id): Path<i32>,
    Json(request): Json<AssignTicket>,
) -> AppResult<Json<StatusResponse>> {
    let principal = resolve(&state, &claims).await?;
    require_staff(&principal)?;
    state.services.tickets.assign(ticket_id, request.agente_id).await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Ticket asignado exitosamente".to_string(),
    }))
}
