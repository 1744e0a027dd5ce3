//! Support agent management endpoints (admin only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::agent::{Agent, AgentSummary, CreateAgent, UpdateAgentStatus},
    models::user::UserClaims,
};

use super::tickets::StatusResponse;
use super::AuthenticatedUser;

fn require_admin(claims: &UserClaims) -> AppResult<()> {
    if claims.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Se requiere rol de administrador".to_string(),
        ))
    }
}

/// List all support agents
#[utoipa::path(
    get,
    path = "/support/agents",
    tag = "agents",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All agents", body = Vec<AgentSummary>),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_agents(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<AgentSummary>>> {
    require_admin(&claims)?;
    let agents = state.services.agents.list().await?;
    Ok(Json(agents))
}

/// Promote a user to support agent
#[utoipa::path(
    post,
    path = "/support/agents",
    tag = "agents",
    security(("bearer_auth" = [])),
    request_body = CreateAgent,
    responses(
        (status = 201, description = "Agent created", body = Agent),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already an agent, or user is an admin")
    )
)]
pub async fn create_agent(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateAgent>,
) -> AppResult<(StatusCode, Json<Agent>)> {
    require_admin(&claims)?;
    let agent = state.services.agents.promote(request.usuario_id).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// Demote a support agent back to a regular user
#[utoipa::path(
    delete,
    path = "/support/agents/{user_id}",
    tag = "agents",
    security(("bearer_auth" = [])),
    params(("user_id" = i32, Path, description = "User ID of the agent")),
    responses(
        (status = 200, description = "Agent removed", body = StatusResponse),
        (status = 404, description = "Agent not found")
    )
)]
pub async fn delete_agent(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<StatusResponse>> {
    require_admin(&claims)?;
    state.services.agents.demote(user_id).await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Agente eliminado exitosamente".to_string(),
    }))
}

/// Update an agent's availability
#[utoipa::path(
    put,
    path = "/support/agents/{user_id}/status",
    tag = "agents",
    security(("bearer_auth" = [])),
    params(("user_id" = i32, Path, description = "User ID of the agent")),
    request_body = UpdateAgentStatus,
    responses(
        (status = 200, description = "Availability updated", body = StatusResponse),
        (status = 404, description = "Agent not found")
    )
)]
pub async fn update_agent_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
    Json(request): Json<UpdateAgentStatus>,
) -> AppResult<Json<StatusResponse>> {
    // Agents may change their own availability; admins anyone's
    if claims.user_id != user_id {
        require_admin(&claims)?;
    }
    state.services.agents.set_availability(user_id, request.estado).await?;
    Ok(Json(StatusResponse {
        success: true,
        message: "Estado actualizado exitosamente".to_string(),
    }))
}
