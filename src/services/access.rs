//! Access control for support tickets
//!
//! One evaluator shared by the HTTP read endpoints and the real-time gateway,
//! so room-join checks and REST reads can never drift apart.

use crate::{
    error::{AppError, AppResult},
    models::{
        ticket::Ticket,
        user::{Principal, UserClaims},
    },
    repository::Repository,
};

/// Role a principal holds with respect to a specific ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketRole {
    Owner,
    Agent,
    Admin,
}

impl TicketRole {
    /// Pure access decision over an already-loaded ticket row.
    ///
    /// Allowed for the owner, any admin, and any registered agent regardless
    /// of assignment (open queue). Owner wins when several apply.
    pub fn resolve(principal: &Principal, ticket: &Ticket) -> AppResult<TicketRole> {
        if ticket.user_id == principal.user_id {
            return Ok(TicketRole::Owner);
        }
        if principal.role.is_admin() {
            return Ok(TicketRole::Admin);
        }
        if principal.is_agent() {
            return Ok(TicketRole::Agent);
        }

        Err(AppError::Authorization(
            "No tienes permiso para acceder a este ticket".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct AccessService {
    repository: Repository,
}

impl AccessService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Resolve token claims into a full principal, including the agent
    /// record. The agent flag comes from the registry, never from the client.
    pub async fn resolve_principal(&self, claims: &UserClaims) -> AppResult<Principal> {
        let agent = self.repository.agents.get_by_user_id(claims.user_id).await?;
        Ok(Principal {
            user_id: claims.user_id,
            role: claims.role,
            agent_id: agent.map(|a| a.id),
        })
    }

    /// Decide whether a principal may join/read/write a ticket's room.
    ///
    /// A missing ticket is NotFound, which callers must keep distinct from
    /// Forbidden. Side-effect free.
    pub async fn can_access_ticket(
        &self,
        principal: &Principal,
        ticket_id: i32,
    ) -> AppResult<TicketRole> {
        let ticket = self.repository.tickets.get_by_id(ticket_id).await?;
        TicketRole::resolve(principal, &ticket)
    }

    /// Cheap predicate for the typing indicator path: ticket owner or admin
    /// only, without loading agent state. Plain agents' indicators are
    /// dropped. Returns false rather than erroring so the relay can silently
    /// discard disallowed indicators.
    pub async fn can_signal_typing(&self, principal: &Principal, ticket_id: i32) -> AppResult<bool> {
        if principal.role.is_admin() {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM support_tickets WHERE id = $1)",
            )
            .bind(ticket_id)
            .fetch_one(&self.repository.pool)
            .await?;
            return Ok(exists);
        }

        let owns = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM support_tickets WHERE id = $1 AND user_id = $2)",
        )
        .bind(ticket_id)
        .bind(principal.user_id)
        .fetch_one(&self.repository.pool)
        .await?;
        Ok(owns)
    }
}
