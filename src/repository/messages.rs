//! Messages repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::message::{MessageView, SenderClass},
};

#[derive(Clone)]
pub struct MessagesRepository {
    pool: Pool<Postgres>,
}

impl MessagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a message with its resolved sender class; returns the new id
    pub async fn insert(
        &self,
        ticket_id: i32,
        sender_id: i32,
        sender_class: SenderClass,
        body: &str,
    ) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO support_messages (ticket_id, sender_id, sender_class, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(ticket_id)
        .bind(sender_id)
        .bind(sender_class)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Fetch one message with the sender's display name resolved
    pub async fn get_view(&self, id: i32) -> AppResult<MessageView> {
        sqlx::query_as::<_, MessageView>(
            r#"
            SELECT m.id, m.ticket_id, m.sender_id, m.sender_class, m.body, m.read,
                   m.created_at, u.name AS sender_name
            FROM support_messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message with id {} not found", id)))
    }

    /// Full message stream of a ticket, in persistence order
    pub async fn list_for_ticket(&self, ticket_id: i32) -> AppResult<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, MessageView>(
            r#"
            SELECT m.id, m.ticket_id, m.sender_id, m.sender_class, m.body, m.read,
                   m.created_at, u.name AS sender_name
            FROM support_messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.ticket_id = $1
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Mark one side's messages in a ticket as read. Owners clear agent
    /// messages; support staff clear user messages. Idempotent.
    pub async fn mark_read(&self, ticket_id: i32, sender_class: SenderClass) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE support_messages SET read = TRUE WHERE ticket_id = $1 AND sender_class = $2",
        )
        .bind(ticket_id)
        .bind(sender_class)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
