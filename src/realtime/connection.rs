//! Per-connection handle
//!
//! One `Connection` per accepted WebSocket; outbound events flow through an
//! unbounded mpsc channel drained by the connection's writer task.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::user::{Principal, Role};

use super::events::ServerEvent;

/// An authenticated, active connection
#[derive(Debug)]
pub struct Connection {
    /// Unique id for this connection's lifetime
    pub id: Uuid,

    /// Authenticated user
    pub user_id: i32,

    pub role: Role,

    /// Agent record id when the user is a registered support agent
    pub agent_id: Option<i32>,

    /// Channel to the writer task for this connection
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn new(principal: Principal, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: principal.user_id,
            role: principal.role,
            agent_id: principal.agent_id,
            sender,
        }
    }

    pub fn is_agent(&self) -> bool {
        self.agent_id.is_some()
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            role: self.role,
            agent_id: self.agent_id,
        }
    }

    /// Fire-and-forget emit. A closed receiver means the connection is going
    /// away; delivery to it is a harmless no-op.
    pub fn send(&self, event: ServerEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!(connection_id = %self.id, "Dropped event for closed connection");
        }
    }
}
