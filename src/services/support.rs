//! Message ingestion pipeline
//!
//! Validates, classifies, and persists one inbound chat message, then runs
//! the first-agent-reply transition. Delivery to the room is the gateway's
//! job; this service ends at the formatted payload.

use crate::{
    error::{AppError, AppResult},
    models::{
        message::{MessagePayload, SenderClass},
        user::Principal,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct SupportService {
    repository: Repository,
}

impl SupportService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Ingest a chat message for a ticket.
    ///
    /// `joined` reports whether the sending connection is currently a member
    /// of the ticket's room; agents must have joined before posting.
    pub async fn ingest(
        &self,
        ticket_id: i32,
        sender: &Principal,
        body: &str,
        joined: bool,
    ) -> AppResult<MessagePayload> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation(
                "El mensaje no puede estar vacío".to_string(),
            ));
        }

        // NotFound before any write
        self.repository.tickets.get_by_id(ticket_id).await?;

        // Sender class comes from the agent registry and the stored role,
        // never from the client
        let sender_class = if sender.is_support_staff() {
            SenderClass::Agente
        } else {
            SenderClass::Usuario
        };

        if sender_class == SenderClass::Agente && !joined {
            return Err(AppError::Authorization(
                "No estás conectado a la sala del ticket".to_string(),
            ));
        }

        let message_id = self
            .repository
            .messages
            .insert(ticket_id, sender.user_id, sender_class, body)
            .await?;

        if sender_class == SenderClass::Agente {
            self.run_first_agent_reply(ticket_id, sender).await?;
        }
        self.repository.tickets.touch(ticket_id).await?;

        let view = self.repository.messages.get_view(message_id).await?;
        Ok(view.into())
    }

    /// First agent reply: assign the replying agent when the ticket has none
    /// (single conditional update, first-agent-wins) and move a pending
    /// ticket to en_proceso. Admin replies classify as agent messages but
    /// carry no agent record, so they never claim the ticket.
    async fn run_first_agent_reply(&self, ticket_id: i32, sender: &Principal) -> AppResult<()> {
        if let Some(agent_id) = sender.agent_id {
            let assigned = self
                .repository
                .tickets
                .try_assign_if_unassigned(ticket_id, agent_id)
                .await?;
            if assigned {
                tracing::info!(ticket_id, agent_id, "Ticket auto-assigned on first agent reply");
            }
        }

        if self.repository.tickets.promote_pending(ticket_id).await? {
            tracing::info!(ticket_id, "Ticket moved to en_proceso");
        }
        Ok(())
    }
}
