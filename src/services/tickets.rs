//! Ticket lifecycle service
//!
//! Creation, assignment, state changes, and closing, with their notification
//! and room-broadcast side effects.

use crate::{
    error::{AppError, AppResult},
    models::{
        message::{MessageView, SenderClass},
        ticket::{Ticket, TicketStatus, TicketSummary},
        user::Principal,
    },
    realtime::{events::ServerEvent, RealtimeGateway},
    repository::Repository,
};

use super::access::{AccessService, TicketRole};
use super::notifications::{NotificationService, CATEGORY_SUPPORT};

#[derive(Clone)]
pub struct TicketsService {
    repository: Repository,
    gateway: RealtimeGateway,
    access: AccessService,
    notifications: NotificationService,
}

impl TicketsService {
    pub fn new(
        repository: Repository,
        gateway: RealtimeGateway,
        access: AccessService,
        notifications: NotificationService,
    ) -> Self {
        Self { repository, gateway, access, notifications }
    }

    /// Open a ticket with its initial message (one transaction), then notify
    /// every admin. Notification failures never undo the ticket.
    pub async fn create(&self, user_id: i32, subject: &str, body: &str) -> AppResult<Ticket> {
        let ticket = self
            .repository
            .tickets
            .create_with_first_message(user_id, subject, body)
            .await?;

        let admins = self.repository.users.list_admin_ids().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not list admins for new-ticket notification");
            Vec::new()
        });
        let message = format!("Nuevo ticket de soporte: {}", subject);
        for admin_id in admins {
            if let Err(e) = self.notifications.notify(admin_id, &message, CATEGORY_SUPPORT).await {
                tracing::warn!(admin_id, error = %e, "Failed to notify admin of new ticket");
            }
        }

        tracing::info!(ticket_id = ticket.id, user_id, "Support ticket created");
        Ok(ticket)
    }

    /// Tickets owned by the calling user
    pub async fn list_own(&self, user_id: i32) -> AppResult<Vec<TicketSummary>> {
        self.repository.tickets.list_for_owner(user_id).await
    }

    /// Staff queue: agents see their tickets plus the unassigned pool,
    /// admins see everything
    pub async fn list_queue(&self, principal: &Principal) -> AppResult<Vec<TicketSummary>> {
        if let Some(agent_id) = principal.agent_id {
            return self.repository.tickets.list_for_agent(agent_id).await;
        }
        if principal.role.is_admin() {
            return self.repository.tickets.list_all().await;
        }
        Err(AppError::Authorization(
            "Solo agentes y administradores pueden ver la cola de tickets".to_string(),
        ))
    }

    /// Read a ticket's message stream (access-checked) and mark the
    /// counterpart's messages as read
    pub async fn messages(
        &self,
        principal: &Principal,
        ticket_id: i32,
    ) -> AppResult<Vec<MessageView>> {
        let role = self.access.can_access_ticket(principal, ticket_id).await?;

        let messages = self.repository.messages.list_for_ticket(ticket_id).await?;

        // Owners clear agent replies; staff clear the user's messages
        let counterpart = match role {
            TicketRole::Owner => SenderClass::Agente,
            TicketRole::Agent | TicketRole::Admin => SenderClass::Usuario,
        };
        self.repository.messages.mark_read(ticket_id, counterpart).await?;

        Ok(messages)
    }

    /// Explicit assignment by staff: forces en_proceso and notifies the
    /// agent. Closed tickets cannot be reassigned.
    pub async fn assign(&self, ticket_id: i32, agent_id: i32) -> AppResult<()> {
        let ticket = self.repository.tickets.get_by_id(ticket_id).await?;
        if ticket.status == TicketStatus::Cerrado {
            return Err(AppError::Conflict(
                "No se puede asignar un ticket cerrado".to_string(),
            ));
        }

        let agent = self.repository.agents.get_by_id(agent_id).await?;
        self.repository.tickets.assign(ticket_id, agent_id).await?;

        let message = format!("Se te ha asignado un nuevo ticket: {}", ticket.subject);
        if let Err(e) = self.notifications.notify(agent.user_id, &message, CATEGORY_SUPPORT).await {
            tracing::warn!(ticket_id, agent_id, error = %e, "Failed to notify assigned agent");
        }

        self.broadcast_update(ticket_id, TicketStatus::EnProceso).await;
        tracing::info!(ticket_id, agent_id, "Ticket explicitly assigned");
        Ok(())
    }

    /// Explicit state change (flat transition set). Notifies the owner and
    /// broadcasts the update.
    pub async fn set_status(&self, ticket_id: i32, status: TicketStatus) -> AppResult<()> {
        let ticket = self.repository.tickets.get_by_id(ticket_id).await?;
        self.repository.tickets.set_status(ticket_id, status).await?;

        let message = format!("El estado de tu ticket ha sido actualizado a: {}", status);
        if let Err(e) = self.notifications.notify(ticket.user_id, &message, CATEGORY_SUPPORT).await {
            tracing::warn!(ticket_id, error = %e, "Failed to notify owner of state change");
        }

        self.broadcast_update(ticket_id, status).await;
        Ok(())
    }

    /// Close a ticket. The owner closing their own ticket gets no
    /// notification; a staff close notifies the owner.
    pub async fn close(&self, principal: &Principal, ticket_id: i32) -> AppResult<()> {
        let ticket = self.repository.tickets.get_by_id(ticket_id).await?;
        let role = TicketRole::resolve(principal, &ticket)?;

        self.repository.tickets.set_status(ticket_id, TicketStatus::Cerrado).await?;

        if role != TicketRole::Owner {
            let message = format!(
                "Tu ticket de soporte \"{}\" ha sido cerrado",
                ticket.subject
            );
            if let Err(e) = self.notifications.notify(ticket.user_id, &message, CATEGORY_SUPPORT).await {
                tracing::warn!(ticket_id, error = %e, "Failed to notify owner of close");
            }
        }

        self.broadcast_update(ticket_id, TicketStatus::Cerrado).await;
        tracing::info!(ticket_id, closed_by = principal.user_id, "Ticket closed");
        Ok(())
    }

    /// Room-wide lifecycle event: the ticket's room plus the agents group
    async fn broadcast_update(&self, ticket_id: i32, estado: TicketStatus) {
        let event = ServerEvent::TicketActualizado { ticket_id, estado };
        self.gateway.emit_to_ticket(ticket_id, event.clone()).await;
        self.gateway.emit_to_agents(event).await;
    }
}
