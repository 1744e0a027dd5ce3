//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{agents, auth, health, notifications, tickets};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblioteca API",
        version = "1.0.0",
        description = "Library management backend with real-time support ticketing",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Tickets
        tickets::create_ticket,
        tickets::my_tickets,
        tickets::all_tickets,
        tickets::ticket_messages,
        tickets::close_ticket,
        tickets::update_ticket_status,
        tickets::assign_ticket,
        // Agents
        agents::list_agents,
        agents::create_agent,
        agents::delete_agent,
        agents::update_agent_status,
        // Notifications
        notifications::list_notifications,
        notifications::mark_notification_read,
        notifications::mark_all_notifications_read,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::LoginRequest,
            auth::LoginResponse,
            auth::MeResponse,
            crate::models::user::Role,
            crate::models::user::UserShort,
            // Tickets
            crate::models::ticket::Ticket,
            crate::models::ticket::TicketSummary,
            crate::models::ticket::TicketStatus,
            crate::models::ticket::CreateTicket,
            crate::models::ticket::UpdateTicketStatus,
            crate::models::ticket::AssignTicket,
            tickets::CreateTicketResponse,
            tickets::StatusResponse,
            // Messages
            crate::models::message::SenderClass,
            crate::models::message::SupportMessage,
            crate::models::message::MessageView,
            crate::models::message::MessagePayload,
            // Agents
            crate::models::agent::Agent,
            crate::models::agent::AgentSummary,
            crate::models::agent::AgentStatus,
            crate::models::agent::CreateAgent,
            crate::models::agent::UpdateAgentStatus,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::NotificationStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "support", description = "Support ticket management"),
        (name = "agents", description = "Support agent management"),
        (name = "notifications", description = "User notifications")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
