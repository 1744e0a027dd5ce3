//! Support agents repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::agent::{Agent, AgentStatus, AgentSummary},
};

#[derive(Clone)]
pub struct AgentsRepository {
    pool: Pool<Postgres>,
}

impl AgentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get agent record by its id
    pub async fn get_by_id(&self, id: i32) -> AppResult<Agent> {
        sqlx::query_as::<_, Agent>("SELECT * FROM support_agents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Agent with id {} not found", id)))
    }

    /// Get the agent record for a user, if any. Absence means the user is not
    /// a registered agent.
    pub async fn get_by_user_id(&self, user_id: i32) -> AppResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>("SELECT * FROM support_agents WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(agent)
    }

    /// All agents with their directory fields, ordered by name
    pub async fn list(&self) -> AppResult<Vec<AgentSummary>> {
        let agents = sqlx::query_as::<_, AgentSummary>(
            r#"
            SELECT sa.id AS agent_id, u.id AS user_id, u.name, u.email, sa.status
            FROM support_agents sa
            JOIN users u ON u.id = sa.user_id
            ORDER BY u.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(agents)
    }

    /// Create an agent record (promotion); starts offline
    pub async fn create(&self, user_id: i32) -> AppResult<Agent> {
        let agent = sqlx::query_as::<_, Agent>(
            r#"
            INSERT INTO support_agents (user_id, status)
            VALUES ($1, 'offline')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(agent)
    }

    /// Remove an agent record (demotion); returns whether a record existed
    pub async fn delete_by_user_id(&self, user_id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM support_agents WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update availability by user id; returns whether the user is an agent
    pub async fn set_status_by_user(&self, user_id: i32, status: AgentStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE support_agents SET status = $1 WHERE user_id = $2")
            .bind(status)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
