//! Support ticket model and lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

/// Ticket lifecycle states, stored and emitted with the frontend spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TicketStatus {
    #[serde(rename = "pendiente")]
    Pendiente,
    #[serde(rename = "en_proceso")]
    EnProceso,
    #[serde(rename = "resuelto")]
    Resuelto,
    #[serde(rename = "cerrado")]
    Cerrado,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pendiente => "pendiente",
            TicketStatus::EnProceso => "en_proceso",
            TicketStatus::Resuelto => "resuelto",
            TicketStatus::Cerrado => "cerrado",
        }
    }

    /// Terminal for normal flow; only an explicit state-set leaves these
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resuelto | TicketStatus::Cerrado)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(TicketStatus::Pendiente),
            "en_proceso" => Ok(TicketStatus::EnProceso),
            "resuelto" => Ok(TicketStatus::Resuelto),
            "cerrado" => Ok(TicketStatus::Cerrado),
            other => Err(format!("Invalid ticket status: {}", other)),
        }
    }
}

impl sqlx::Type<Postgres> for TicketStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for TicketStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for TicketStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Support ticket row
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Ticket {
    pub id: i32,
    /// Owning user
    pub user_id: i32,
    pub subject: String,
    pub status: TicketStatus,
    /// Assigned agent record id; null until first agent reply or explicit assignment
    pub agent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ticket listing entry with resolved names and unread counter
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TicketSummary {
    pub id: i32,
    pub user_id: i32,
    pub subject: String,
    pub status: TicketStatus,
    pub agent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ticket owner's display name
    pub user_name: String,
    /// Assigned agent's display name, when assigned
    pub agent_name: Option<String>,
    /// Messages from the counterpart not yet read by this side
    pub unread_messages: i64,
}

/// Request body for opening a ticket (subject + initial message)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTicket {
    #[validate(length(min = 1, max = 200))]
    pub asunto: String,
    #[validate(length(min = 1))]
    pub mensaje: String,
}

/// Request body for an explicit state change
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTicketStatus {
    pub estado: TicketStatus,
}

/// Request body for an explicit agent assignment
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignTicket {
    pub agente_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            TicketStatus::Pendiente,
            TicketStatus::EnProceso,
            TicketStatus::Resuelto,
            TicketStatus::Cerrado,
        ] {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
        assert!("abierto".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!TicketStatus::Pendiente.is_terminal());
        assert!(!TicketStatus::EnProceso.is_terminal());
        assert!(TicketStatus::Resuelto.is_terminal());
        assert!(TicketStatus::Cerrado.is_terminal());
    }

    #[test]
    fn status_serializes_with_wire_spelling() {
        let json = serde_json::to_string(&TicketStatus::EnProceso).unwrap();
        assert_eq!(json, r#""en_proceso""#);
    }
}
