//! Real-time gateway
//!
//! The WebSocket side of the support subsystem: connection handling, the
//! presence/room registry, and the tagged event protocol. A single
//! `RealtimeGateway` is constructed at startup and handed to every component
//! that emits, so nothing reaches for global state.

pub mod connection;
pub mod events;
pub mod handler;
pub mod registry;

use registry::{Registry, RoomId};

use events::ServerEvent;

/// Handle for emitting real-time events; cheap to clone and passed explicitly
/// to the services that need it
#[derive(Clone, Default)]
pub struct RealtimeGateway {
    registry: Registry,
}

impl RealtimeGateway {
    pub fn new() -> Self {
        Self { registry: Registry::new() }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Emit to all of a user's connections; returns delivered count
    pub async fn emit_to_user(&self, user_id: i32, event: ServerEvent) -> usize {
        self.registry.emit_to_user(user_id, event).await
    }

    /// Emit to a ticket's room
    pub async fn emit_to_ticket(&self, ticket_id: i32, event: ServerEvent) -> usize {
        self.registry.broadcast(RoomId::Ticket(ticket_id), event).await
    }

    /// Emit to the all-agents group
    pub async fn emit_to_agents(&self, event: ServerEvent) -> usize {
        self.registry.broadcast(RoomId::Agents, event).await
    }
}
