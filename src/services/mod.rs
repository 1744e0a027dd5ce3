//! Business logic services

pub mod access;
pub mod agents;
pub mod notifications;
pub mod support;
pub mod tickets;
pub mod users;

use crate::{config::AuthConfig, realtime::RealtimeGateway, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub access: access::AccessService,
    pub tickets: tickets::TicketsService,
    pub support: support::SupportService,
    pub agents: agents::AgentsService,
    pub notifications: notifications::NotificationService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository and real-time gateway.
    /// The gateway arrives through explicit wiring; no service reaches for a
    /// global emitter.
    pub fn new(repository: Repository, gateway: RealtimeGateway, auth_config: AuthConfig) -> Self {
        let access = access::AccessService::new(repository.clone());
        let notifications =
            notifications::NotificationService::new(repository.clone(), gateway.clone());
        Self {
            tickets: tickets::TicketsService::new(
                repository.clone(),
                gateway,
                access.clone(),
                notifications.clone(),
            ),
            support: support::SupportService::new(repository.clone()),
            agents: agents::AgentsService::new(repository.clone()),
            users: users::UsersService::new(repository, auth_config),
            access,
            notifications,
        }
    }
}
