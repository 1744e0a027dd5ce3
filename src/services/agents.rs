//! Support agent management: promotion, demotion, availability

use crate::{
    error::{AppError, AppResult},
    models::{
        agent::{Agent, AgentStatus, AgentSummary},
        user::Role,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AgentsService {
    repository: Repository,
}

impl AgentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<AgentSummary>> {
        self.repository.agents.list().await
    }

    /// Promote a user to support agent. Admins cannot hold an agent record,
    /// and promotion is rejected for users who already have one.
    pub async fn promote(&self, user_id: i32) -> AppResult<Agent> {
        let user = self.repository.users.get_by_id(user_id).await?;
        if user.role.is_admin() {
            return Err(AppError::Conflict(
                "No se puede convertir un administrador en agente".to_string(),
            ));
        }
        if self.repository.agents.get_by_user_id(user_id).await?.is_some() {
            return Err(AppError::Conflict(
                "El usuario ya es agente de soporte".to_string(),
            ));
        }

        let agent = self.repository.agents.create(user_id).await?;
        self.repository.users.set_role(user_id, Role::Agente).await?;
        tracing::info!(user_id, agent_id = agent.id, "User promoted to support agent");
        Ok(agent)
    }

    /// Demote an agent: drop the record and reset the user's role
    pub async fn demote(&self, user_id: i32) -> AppResult<()> {
        let existed = self.repository.agents.delete_by_user_id(user_id).await?;
        if !existed {
            return Err(AppError::NotFound("Agente no encontrado".to_string()));
        }
        self.repository.users.set_role(user_id, Role::Usuario).await?;
        tracing::info!(user_id, "Support agent demoted");
        Ok(())
    }

    /// Update an agent's availability
    pub async fn set_availability(&self, user_id: i32, status: AgentStatus) -> AppResult<()> {
        let updated = self.repository.agents.set_status_by_user(user_id, status).await?;
        if !updated {
            return Err(AppError::NotFound("Agente no encontrado".to_string()));
        }
        Ok(())
    }
}
