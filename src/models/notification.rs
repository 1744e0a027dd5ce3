//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Read state, stored with the frontend spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum NotificationStatus {
    #[serde(rename = "no_leida")]
    NoLeida,
    #[serde(rename = "leida")]
    Leida,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::NoLeida => "no_leida",
            NotificationStatus::Leida => "leida",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_leida" => Ok(NotificationStatus::NoLeida),
            "leida" => Ok(NotificationStatus::Leida),
            other => Err(format!("Invalid notification status: {}", other)),
        }
    }
}

impl sqlx::Type<Postgres> for NotificationStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for NotificationStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for NotificationStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Persisted notification; accumulates per recipient, mutated only by
/// mark-read operations
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub message: String,
    /// Category tag ("soporte", "prestamo", ...)
    pub category: String,
    pub status: NotificationStatus,
    /// Convenience flag the frontend keys on
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        assert_eq!("no_leida".parse::<NotificationStatus>().unwrap(), NotificationStatus::NoLeida);
        assert_eq!("leida".parse::<NotificationStatus>().unwrap(), NotificationStatus::Leida);
        assert!("vista".parse::<NotificationStatus>().is_err());
    }
}
