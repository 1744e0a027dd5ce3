//! Support message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Classification of a message author, derived at ingestion time from the
/// agent registry and the sender's role. Never trusted from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SenderClass {
    #[serde(rename = "usuario")]
    Usuario,
    #[serde(rename = "agente")]
    Agente,
}

impl SenderClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderClass::Usuario => "usuario",
            SenderClass::Agente => "agente",
        }
    }
}

impl std::fmt::Display for SenderClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SenderClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usuario" => Ok(SenderClass::Usuario),
            "agente" => Ok(SenderClass::Agente),
            other => Err(format!("Invalid sender class: {}", other)),
        }
    }
}

impl sqlx::Type<Postgres> for SenderClass {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for SenderClass {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for SenderClass {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Persisted support message; append-only except the read flag
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct SupportMessage {
    pub id: i32,
    pub ticket_id: i32,
    pub sender_id: i32,
    pub sender_class: SenderClass,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Message view returned by the read endpoint: the row plus the sender's
/// display name resolved from the user directory
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct MessageView {
    pub id: i32,
    pub ticket_id: i32,
    pub sender_id: i32,
    pub sender_class: SenderClass,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub sender_name: String,
}

/// Formatted payload delivered over the real-time channel, with the field
/// names the frontend expects
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessagePayload {
    #[serde(rename = "mensajeId")]
    pub mensaje_id: i32,
    #[serde(rename = "ticketId")]
    pub ticket_id: i32,
    #[serde(rename = "emisorId")]
    pub emisor_id: i32,
    pub tipo: SenderClass,
    pub mensaje: String,
    pub leido: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "nombreEmisor")]
    pub nombre_emisor: String,
}

impl From<MessageView> for MessagePayload {
    fn from(m: MessageView) -> Self {
        Self {
            mensaje_id: m.id,
            ticket_id: m.ticket_id,
            emisor_id: m.sender_id,
            tipo: m.sender_class,
            mensaje: m.body,
            leido: m.read,
            created_at: m.created_at,
            nombre_emisor: m.sender_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_class_round_trip() {
        assert_eq!("usuario".parse::<SenderClass>().unwrap(), SenderClass::Usuario);
        assert_eq!("agente".parse::<SenderClass>().unwrap(), SenderClass::Agente);
        assert!("admin".parse::<SenderClass>().is_err());
    }

    #[test]
    fn payload_uses_frontend_field_names() {
        let payload = MessagePayload {
            mensaje_id: 3,
            ticket_id: 9,
            emisor_id: 5,
            tipo: SenderClass::Agente,
            mensaje: "¿En qué puedo ayudarte?".to_string(),
            leido: false,
            created_at: chrono::Utc::now(),
            nombre_emisor: "Carmen".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["mensajeId"], 3);
        assert_eq!(json["tipo"], "agente");
        assert_eq!(json["nombreEmisor"], "Carmen");
    }
}
