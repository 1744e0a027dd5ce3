//! Presence & room registry
//!
//! Process-wide map of live connections and their room memberships. Rooms are
//! named by an explicit `RoomId` (no string-built identifiers): one room per
//! ticket, one personal room per user, and the all-agents broadcast group.
//! Purely in-memory routing state; starts empty on every process start.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

/// Real-time delivery scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomId {
    /// One ticket's participants
    Ticket(i32),
    /// One user's personal channel (notifications, acks)
    User(i32),
    /// Every connected agent
    Agents,
}

/// Outcome of removing a connection, used by the gateway for the best-effort
/// agent-offline flip
#[derive(Debug)]
pub struct Departure {
    pub user_id: i32,
    pub was_agent: bool,
    /// No other connection of the same user remains
    pub last_for_user: bool,
}

#[derive(Default)]
struct RegistryInner {
    /// All live connections by connection id
    connections: HashMap<Uuid, Arc<Connection>>,
    /// room -> member connections
    rooms: HashMap<RoomId, HashSet<Uuid>>,
    /// connection -> joined rooms (kept in sync with `rooms`)
    memberships: HashMap<Uuid, HashSet<RoomId>>,
}

impl RegistryInner {
    fn join(&mut self, connection_id: Uuid, room: RoomId) {
        self.rooms.entry(room).or_default().insert(connection_id);
        self.memberships.entry(connection_id).or_default().insert(room);
    }

    fn leave(&mut self, connection_id: &Uuid, room: RoomId) {
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        if let Some(rooms) = self.memberships.get_mut(connection_id) {
            rooms.remove(&room);
        }
    }
}

/// Presence & room registry shared by the gateway and the services that emit
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection: tracks it, auto-joins its personal room, and joins
    /// the agents group for agent users
    pub async fn register(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut inner = self.inner.write().await;
        inner.connections.insert(conn.id, Arc::clone(&conn));
        inner.join(conn.id, RoomId::User(conn.user_id));
        if conn.is_agent() {
            inner.join(conn.id, RoomId::Agents);
        }

        tracing::info!(
            connection_id = %conn.id,
            user_id = conn.user_id,
            agent = conn.is_agent(),
            total_connections = inner.connections.len(),
            "Connection registered"
        );
        conn
    }

    /// Drop a connection and every membership it held
    pub async fn unregister(&self, connection_id: &Uuid) -> Option<Departure> {
        let mut inner = self.inner.write().await;
        let conn = inner.connections.remove(connection_id)?;

        if let Some(rooms) = inner.memberships.remove(connection_id) {
            for room in rooms {
                if let Some(members) = inner.rooms.get_mut(&room) {
                    members.remove(connection_id);
                    if members.is_empty() {
                        inner.rooms.remove(&room);
                    }
                }
            }
        }

        let last_for_user = !inner
            .connections
            .values()
            .any(|c| c.user_id == conn.user_id);

        tracing::info!(
            connection_id = %connection_id,
            user_id = conn.user_id,
            remaining_connections = inner.connections.len(),
            "Connection unregistered"
        );

        Some(Departure {
            user_id: conn.user_id,
            was_agent: conn.is_agent(),
            last_for_user,
        })
    }

    /// Idempotent room join
    pub async fn join(&self, connection_id: &Uuid, room: RoomId) {
        let mut inner = self.inner.write().await;
        if inner.connections.contains_key(connection_id) {
            inner.join(*connection_id, room);
            tracing::debug!(connection_id = %connection_id, room = ?room, "Joined room");
        }
    }

    /// Idempotent room leave
    pub async fn leave(&self, connection_id: &Uuid, room: RoomId) {
        let mut inner = self.inner.write().await;
        inner.leave(connection_id, room);
        tracing::debug!(connection_id = %connection_id, room = ?room, "Left room");
    }

    /// Whether a connection is currently a member of a room
    pub async fn is_member(&self, connection_id: &Uuid, room: RoomId) -> bool {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(&room)
            .map(|members| members.contains(connection_id))
            .unwrap_or(false)
    }

    /// Emit to every member of a room; returns delivered count. Emitting to
    /// an empty or missing room is a no-op.
    pub async fn broadcast(&self, room: RoomId, event: ServerEvent) -> usize {
        self.broadcast_filtered(room, event, None).await
    }

    /// Emit to every room member except one connection (typically the sender)
    pub async fn broadcast_except(
        &self,
        room: RoomId,
        except: &Uuid,
        event: ServerEvent,
    ) -> usize {
        self.broadcast_filtered(room, event, Some(except)).await
    }

    async fn broadcast_filtered(
        &self,
        room: RoomId,
        event: ServerEvent,
        except: Option<&Uuid>,
    ) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(&room) else {
            return 0;
        };

        let mut delivered = 0;
        for id in members {
            if Some(id) == except {
                continue;
            }
            if let Some(conn) = inner.connections.get(id) {
                conn.send(event.clone());
                delivered += 1;
            }
        }
        delivered
    }

    /// Emit to every connection of one user (their personal room)
    pub async fn emit_to_user(&self, user_id: i32, event: ServerEvent) -> usize {
        self.broadcast(RoomId::User(user_id), event).await
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn room_size(&self, room: RoomId) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&room)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Principal, Role};
    use tokio::sync::mpsc;

    fn user_conn(user_id: i32) -> (Connection, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let principal = Principal { user_id, role: Role::Usuario, agent_id: None };
        (Connection::new(principal, tx), rx)
    }

    fn agent_conn(user_id: i32, agent_id: i32) -> (Connection, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let principal = Principal { user_id, role: Role::Agente, agent_id: Some(agent_id) };
        (Connection::new(principal, tx), rx)
    }

    #[tokio::test]
    async fn register_joins_personal_room() {
        let registry = Registry::new();
        let (conn, mut rx) = user_conn(5);
        registry.register(conn).await;

        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(registry.room_size(RoomId::User(5)).await, 1);
        assert_eq!(registry.room_size(RoomId::Agents).await, 0);

        let delivered = registry
            .emit_to_user(5, ServerEvent::NotificationsCleared)
            .await;
        assert_eq!(delivered, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn agents_join_broadcast_group() {
        let registry = Registry::new();
        let (conn, _rx) = agent_conn(8, 2);
        registry.register(conn).await;
        assert_eq!(registry.room_size(RoomId::Agents).await, 1);
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let registry = Registry::new();
        let (conn, _rx) = user_conn(1);
        let conn = registry.register(conn).await;

        registry.join(&conn.id, RoomId::Ticket(9)).await;
        registry.join(&conn.id, RoomId::Ticket(9)).await;
        assert_eq!(registry.room_size(RoomId::Ticket(9)).await, 1);

        registry.leave(&conn.id, RoomId::Ticket(9)).await;
        assert_eq!(registry.room_size(RoomId::Ticket(9)).await, 0);
        // Leaving again is fine
        registry.leave(&conn.id, RoomId::Ticket(9)).await;
    }

    #[tokio::test]
    async fn broadcast_except_skips_the_sender() {
        let registry = Registry::new();
        let (conn_a, mut rx_a) = user_conn(1);
        let (conn_b, mut rx_b) = user_conn(2);
        let conn_a = registry.register(conn_a).await;
        let conn_b = registry.register(conn_b).await;

        registry.join(&conn_a.id, RoomId::Ticket(3)).await;
        registry.join(&conn_b.id, RoomId::Ticket(3)).await;

        let delivered = registry
            .broadcast_except(RoomId::Ticket(3), &conn_a.id, ServerEvent::NotificationsCleared)
            .await;
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unregister_removes_all_memberships() {
        let registry = Registry::new();
        let (conn, _rx) = agent_conn(4, 1);
        let conn = registry.register(conn).await;
        registry.join(&conn.id, RoomId::Ticket(1)).await;
        registry.join(&conn.id, RoomId::Ticket(2)).await;

        let departure = registry.unregister(&conn.id).await.unwrap();
        assert!(departure.was_agent);
        assert!(departure.last_for_user);
        assert_eq!(departure.user_id, 4);

        assert_eq!(registry.connection_count().await, 0);
        assert_eq!(registry.room_size(RoomId::Ticket(1)).await, 0);
        assert_eq!(registry.room_size(RoomId::Ticket(2)).await, 0);
        assert_eq!(registry.room_size(RoomId::Agents).await, 0);

        // Unknown connection: nothing to do
        assert!(registry.unregister(&conn.id).await.is_none());
    }

    #[tokio::test]
    async fn departure_tracks_remaining_user_connections() {
        let registry = Registry::new();
        let (first, _rx1) = agent_conn(4, 1);
        let (second, _rx2) = agent_conn(4, 1);
        let first = registry.register(first).await;
        let second = registry.register(second).await;

        let departure = registry.unregister(&first.id).await.unwrap();
        assert!(!departure.last_for_user);

        let departure = registry.unregister(&second.id).await.unwrap();
        assert!(departure.last_for_user);
    }

    #[tokio::test]
    async fn broadcast_to_empty_room_is_a_noop() {
        let registry = Registry::new();
        let delivered = registry
            .broadcast(RoomId::Ticket(99), ServerEvent::NotificationsCleared)
            .await;
        assert_eq!(delivered, 0);
    }
}
