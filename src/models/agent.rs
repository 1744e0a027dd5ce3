//! Support agent model

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Agent availability, stored with the frontend spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AgentStatus {
    #[serde(rename = "disponible")]
    Disponible,
    #[serde(rename = "ocupado")]
    Ocupado,
    #[serde(rename = "offline")]
    Offline,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Disponible => "disponible",
            AgentStatus::Ocupado => "ocupado",
            AgentStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disponible" => Ok(AgentStatus::Disponible),
            "ocupado" => Ok(AgentStatus::Ocupado),
            "offline" => Ok(AgentStatus::Offline),
            other => Err(format!("Invalid agent status: {}", other)),
        }
    }
}

impl sqlx::Type<Postgres> for AgentStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for AgentStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for AgentStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Agent registry row; maps a user to the support-agent role
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Agent {
    pub id: i32,
    pub user_id: i32,
    pub status: AgentStatus,
}

/// Agent listing entry with the user's directory fields resolved
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct AgentSummary {
    pub agent_id: i32,
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub status: AgentStatus,
}

/// Request body for promoting a user to agent
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAgent {
    pub usuario_id: i32,
}

/// Request body for an availability change
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAgentStatus {
    pub estado: AgentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [AgentStatus::Disponible, AgentStatus::Ocupado, AgentStatus::Offline] {
            assert_eq!(status.as_str().parse::<AgentStatus>().unwrap(), status);
        }
        assert!("ausente".parse::<AgentStatus>().is_err());
    }
}
