//! Notification fan-out service
//!
//! Persists first, delivers second: the stored row is the durability
//! contract, real-time delivery is best effort and never rolls back the
//! operation that triggered it.

use crate::{
    error::AppResult,
    models::notification::Notification,
    realtime::{events::ServerEvent, RealtimeGateway},
    repository::Repository,
};

/// Category tag used for every support-domain notification
pub const CATEGORY_SUPPORT: &str = "soporte";

#[derive(Clone)]
pub struct NotificationService {
    repository: Repository,
    gateway: RealtimeGateway,
}

impl NotificationService {
    pub fn new(repository: Repository, gateway: RealtimeGateway) -> Self {
        Self { repository, gateway }
    }

    /// Persist a notification, then push it to the recipient's connections.
    /// An offline recipient simply picks it up in the catch-up batch on their
    /// next registration.
    pub async fn notify(&self, user_id: i32, message: &str, category: &str) -> AppResult<Notification> {
        let notification = self.repository.notifications.insert(user_id, message, category).await?;

        let delivered = self
            .gateway
            .emit_to_user(user_id, ServerEvent::NuevaNotificacion(notification.clone()))
            .await;
        if delivered == 0 {
            tracing::debug!(user_id, "Recipient offline, notification queued in storage");
        }

        Ok(notification)
    }

    /// Reconnection catch-up: push every unread notification, newest first,
    /// as one batch. Failures are logged and swallowed; registration must not
    /// fail because the catch-up did.
    pub async fn send_pending(&self, user_id: i32) {
        match self.repository.notifications.list_unread(user_id).await {
            Ok(notificaciones) if !notificaciones.is_empty() => {
                self.gateway
                    .emit_to_user(user_id, ServerEvent::NotificacionesPendientes { notificaciones })
                    .await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to send pending notifications");
            }
        }
    }

    /// Every notification for a user, newest first
    pub async fn list(&self, user_id: i32) -> AppResult<Vec<Notification>> {
        self.repository.notifications.list_for_user(user_id).await
    }

    /// Mark one notification read and ack the acting user's own connections.
    /// Idempotent: re-marking an already-read notification still acks.
    pub async fn mark_read(&self, notification_id: i32, user_id: i32) -> AppResult<()> {
        self.repository.notifications.mark_read(notification_id, user_id).await?;
        self.gateway
            .emit_to_user(user_id, ServerEvent::NotificationUpdate { id: notification_id, read: true })
            .await;
        Ok(())
    }

    /// Mark every notification read and ack. Idempotent.
    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<()> {
        self.repository.notifications.mark_all_read(user_id).await?;
        self.gateway
            .emit_to_user(user_id, ServerEvent::NotificationsCleared)
            .await;
        Ok(())
    }
}
