//! Notifications repository for database operations

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::notification::Notification};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, message, category, status, (status = 'leida') AS read, created_at";

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Persist a notification; durability point of the fan-out contract
    pub async fn insert(
        &self,
        user_id: i32,
        message: &str,
        category: &str,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, message, category, status)
            VALUES ($1, $2, $3, 'no_leida')
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(message)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    /// Every notification for a user, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Unread notifications for a user, newest first (reconnection catch-up)
    pub async fn list_unread(&self, user_id: i32) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1 AND status = 'no_leida'
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Mark one notification read; scoped to the recipient. Idempotent.
    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'leida' WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark every notification of a user read. Idempotent.
    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let result = sqlx::query("UPDATE notifications SET status = 'leida' WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
