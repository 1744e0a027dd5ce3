//! Real-time protocol events
//!
//! Closed sets of tagged client and server events. Anything arriving that
//! does not match a known variant shape is rejected at the gateway boundary.
//! Wire names and payload fields match the frontend contract.

use serde::{Deserialize, Serialize};

use crate::models::{
    message::MessagePayload, notification::Notification, ticket::TicketStatus,
};

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join a ticket's room (access-checked)
    JoinTicket {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
    },

    /// Leave a ticket's room (unconditional)
    LeaveTicket {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
    },

    /// Typing indicator, relayed to room peers
    TypingSupport {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
    },

    /// Post a message into a joined ticket room
    SendSupportMessage {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
        contenido: String,
    },

    /// Mark one notification read
    MarkNotificationRead {
        #[serde(rename = "notificationId")]
        notification_id: i32,
    },

    /// Mark every notification read
    ClearAllNotifications,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Join acknowledged
    JoinedTicket {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
    },

    /// Leave acknowledged
    LeftTicket {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
    },

    /// Room- or connection-scoped error for ticket operations
    ErrorTicket { message: String },

    /// A room peer is typing
    UserTypingSupport {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
        #[serde(rename = "userId")]
        user_id: i32,
    },

    /// New support message (room broadcast and sender echo)
    NuevoMensajeSoporte(MessagePayload),

    /// Durability ack to the sender
    MensajeEnviadoConfirmacion {
        success: bool,
        #[serde(rename = "mensajeId")]
        mensaje_id: i32,
    },

    /// Message rejected; sent to the sender only
    ErrorMensajeSoporte { message: String },

    /// Unread notification batch pushed on (re)connection, newest first
    NotificacionesPendientes { notificaciones: Vec<Notification> },

    /// One freshly persisted notification
    NuevaNotificacion(Notification),

    /// Single mark-read ack
    NotificationUpdate { id: i32, read: bool },

    /// Mark-all-read ack
    NotificationsCleared,

    /// Ticket lifecycle change, broadcast room-wide
    TicketActualizado {
        #[serde(rename = "ticketId")]
        ticket_id: i32,
        estado: TicketStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::SenderClass;

    #[test]
    fn client_event_deserialization() {
        let json = r#"{"type":"join_ticket","ticketId":12}"#;
        match serde_json::from_str::<ClientEvent>(json).unwrap() {
            ClientEvent::JoinTicket { ticket_id } => assert_eq!(ticket_id, 12),
            other => panic!("Expected JoinTicket, got {:?}", other),
        }

        let json = r#"{"type":"send_support_message","ticketId":3,"contenido":"hola"}"#;
        match serde_json::from_str::<ClientEvent>(json).unwrap() {
            ClientEvent::SendSupportMessage { ticket_id, contenido } => {
                assert_eq!(ticket_id, 3);
                assert_eq!(contenido, "hola");
            }
            other => panic!("Expected SendSupportMessage, got {:?}", other),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let json = r#"{"type":"drop_all_tables"}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());

        // Known tag with a missing field is just as invalid
        let json = r#"{"type":"send_support_message","ticketId":3}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }

    #[test]
    fn server_event_wire_names() {
        let event = ServerEvent::NotificationsCleared;
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"notifications_cleared"}"#
        );

        let event = ServerEvent::TicketActualizado {
            ticket_id: 7,
            estado: TicketStatus::Cerrado,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ticket_actualizado");
        assert_eq!(json["ticketId"], 7);
        assert_eq!(json["estado"], "cerrado");
    }

    #[test]
    fn message_event_inlines_payload() {
        let event = ServerEvent::NuevoMensajeSoporte(MessagePayload {
            mensaje_id: 1,
            ticket_id: 2,
            emisor_id: 3,
            tipo: SenderClass::Usuario,
            mensaje: "hola".to_string(),
            leido: false,
            created_at: chrono::Utc::now(),
            nombre_emisor: "Luis".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "nuevo_mensaje_soporte");
        assert_eq!(json["mensajeId"], 1);
        assert_eq!(json["tipo"], "usuario");
    }
}
