//! User model and authentication claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

/// User roles, stored with the wire spelling used by the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "usuario")]
    Usuario,
    #[serde(rename = "agente")]
    Agente,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Usuario => "usuario",
            Role::Agente => "agente",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usuario" => Ok(Role::Usuario),
            "agente" => Ok(Role::Agente),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

// SQLx conversion for Role (stored as text)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Full user record
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user (no credentials)
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// JWT claims attached to every authenticated request and connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// Authenticated identity resolved for a request or connection:
/// user id, role, and the agent record id when the user is a support agent.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: i32,
    pub role: Role,
    pub agent_id: Option<i32>,
}

impl Principal {
    pub fn is_agent(&self) -> bool {
        self.agent_id.is_some()
    }

    /// True when the principal handles tickets: registered agent or admin
    pub fn is_support_staff(&self) -> bool {
        self.agent_id.is_some() || self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in [Role::Usuario, Role::Agente, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn claims_token_round_trip() {
        let claims = UserClaims {
            sub: "ana@example.org".to_string(),
            user_id: 7,
            role: Role::Admin,
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        };
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.role, Role::Admin);
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn principal_staff_predicate() {
        let owner = Principal { user_id: 1, role: Role::Usuario, agent_id: None };
        let agent = Principal { user_id: 2, role: Role::Agente, agent_id: Some(4) };
        let admin = Principal { user_id: 3, role: Role::Admin, agent_id: None };
        assert!(!owner.is_support_staff());
        assert!(agent.is_support_staff());
        assert!(admin.is_support_staff());
    }
}
