//! Repository layer for database operations

pub mod agents;
pub mod messages;
pub mod notifications;
pub mod tickets;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub tickets: tickets::TicketsRepository,
    pub messages: messages::MessagesRepository,
    pub agents: agents::AgentsRepository,
    pub notifications: notifications::NotificationsRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            tickets: tickets::TicketsRepository::new(pool.clone()),
            messages: messages::MessagesRepository::new(pool.clone()),
            agents: agents::AgentsRepository::new(pool.clone()),
            notifications: notifications::NotificationsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }
}
