//! Tickets repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::ticket::{Ticket, TicketStatus, TicketSummary},
};

const SUMMARY_COLUMNS: &str = r#"
    t.id, t.user_id, t.subject, t.status, t.agent_id, t.created_at, t.updated_at,
    u.name AS user_name,
    au.name AS agent_name
"#;

#[derive(Clone)]
pub struct TicketsRepository {
    pool: Pool<Postgres>,
}

impl TicketsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get ticket by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Ticket> {
        sqlx::query_as::<_, Ticket>("SELECT * FROM support_tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket with id {} not found", id)))
    }

    /// Create a ticket together with its first message, atomically.
    /// Partial application (ticket row with no message) is a correctness
    /// violation, so both inserts share one transaction.
    pub async fn create_with_first_message(
        &self,
        user_id: i32,
        subject: &str,
        body: &str,
    ) -> AppResult<Ticket> {
        let mut tx = self.pool.begin().await?;

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO support_tickets (user_id, subject, status)
            VALUES ($1, $2, 'pendiente')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(subject)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO support_messages (ticket_id, sender_id, sender_class, body)
            VALUES ($1, $2, 'usuario', $3)
            "#,
        )
        .bind(ticket.id)
        .bind(user_id)
        .bind(body)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    /// Tickets owned by a user, newest activity first, with the count of
    /// unread agent replies
    pub async fn list_for_owner(&self, user_id: i32) -> AppResult<Vec<TicketSummary>> {
        let tickets = sqlx::query_as::<_, TicketSummary>(&format!(
            r#"
            SELECT {SUMMARY_COLUMNS},
                   (SELECT COUNT(*) FROM support_messages m
                     WHERE m.ticket_id = t.id AND m.sender_class = 'agente' AND NOT m.read)
                       AS unread_messages
            FROM support_tickets t
            JOIN users u ON u.id = t.user_id
            LEFT JOIN support_agents sa ON sa.id = t.agent_id
            LEFT JOIN users au ON au.id = sa.user_id
            WHERE t.user_id = $1
            ORDER BY t.updated_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    /// Open-queue view for an agent: tickets assigned to them plus every
    /// unassigned ticket, with the count of unread user messages
    pub async fn list_for_agent(&self, agent_id: i32) -> AppResult<Vec<TicketSummary>> {
        let tickets = sqlx::query_as::<_, TicketSummary>(&format!(
            r#"
            SELECT {SUMMARY_COLUMNS},
                   (SELECT COUNT(*) FROM support_messages m
                     WHERE m.ticket_id = t.id AND m.sender_class = 'usuario' AND NOT m.read)
                       AS unread_messages
            FROM support_tickets t
            JOIN users u ON u.id = t.user_id
            LEFT JOIN support_agents sa ON sa.id = t.agent_id
            LEFT JOIN users au ON au.id = sa.user_id
            WHERE t.agent_id = $1 OR t.agent_id IS NULL
            ORDER BY t.created_at DESC
            "#
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    /// Every ticket (admin view)
    pub async fn list_all(&self) -> AppResult<Vec<TicketSummary>> {
        let tickets = sqlx::query_as::<_, TicketSummary>(&format!(
            r#"
            SELECT {SUMMARY_COLUMNS},
                   (SELECT COUNT(*) FROM support_messages m
                     WHERE m.ticket_id = t.id AND m.sender_class = 'usuario' AND NOT m.read)
                       AS unread_messages
            FROM support_tickets t
            JOIN users u ON u.id = t.user_id
            LEFT JOIN support_agents sa ON sa.id = t.agent_id
            LEFT JOIN users au ON au.id = sa.user_id
            ORDER BY t.created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    /// First-agent-reply auto-assignment: assigns only when no agent holds the
    /// ticket yet. A single conditional update, so two agents racing on the
    /// same ticket resolve to first-writer-wins.
    pub async fn try_assign_if_unassigned(&self, ticket_id: i32, agent_id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE support_tickets
            SET agent_id = $1, updated_at = NOW()
            WHERE id = $2 AND agent_id IS NULL
            "#,
        )
        .bind(agent_id)
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a pending ticket to en_proceso; no-op for any other state
    pub async fn promote_pending(&self, ticket_id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE support_tickets
            SET status = 'en_proceso', updated_at = NOW()
            WHERE id = $1 AND status = 'pendiente'
            "#,
        )
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Explicit assignment: sets the agent and forces en_proceso
    pub async fn assign(&self, ticket_id: i32, agent_id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE support_tickets
            SET agent_id = $1, status = 'en_proceso', updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(agent_id)
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Refresh a ticket's activity timestamp (keeps listings ordered by
    /// latest traffic)
    pub async fn touch(&self, ticket_id: i32) -> AppResult<()> {
        sqlx::query("UPDATE support_tickets SET updated_at = NOW() WHERE id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Explicit state change, flat (any state reachable from any state)
    pub async fn set_status(&self, ticket_id: i32, status: TicketStatus) -> AppResult<()> {
        sqlx::query(
            "UPDATE support_tickets SET status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(status)
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
