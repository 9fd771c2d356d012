//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse authorization tag gating endpoint access.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Map a stored role column; unknown values degrade to `user`.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user; the password hash is never serialized.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: i64,
}

/// Login/registration response. The access token is prefixed with `Bearer `
/// on this endpoint, matching the storefront's historical wire format;
/// clients normalize at their storage boundary.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Refresh response; the token here is unprefixed.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn role_round_trips_lowercase() -> Result<()> {
        let value = serde_json::to_value(Role::Admin)?;
        assert_eq!(value, serde_json::json!("admin"));
        let decoded: Role = serde_json::from_value(serde_json::json!("user"))?;
        assert_eq!(decoded, Role::User);
        Ok(())
    }

    #[test]
    fn role_from_db_defaults_to_user() {
        assert_eq!(Role::from_db("admin"), Role::Admin);
        assert_eq!(Role::from_db("user"), Role::User);
        assert_eq!(Role::from_db("mystery"), Role::User);
    }

    #[test]
    fn user_response_uses_camel_case() -> Result<()> {
        let user = UserResponse {
            id: "id".to_string(),
            name: "Bob".to_string(),
            email: "bob@buildmart.dev".to_string(),
            role: Role::User,
            created_at: 1_700_000_000,
        };
        let value = serde_json::to_value(&user)?;
        let created = value
            .get("createdAt")
            .and_then(serde_json::Value::as_i64)
            .context("missing createdAt")?;
        assert_eq!(created, 1_700_000_000);
        Ok(())
    }

    #[test]
    fn refresh_response_uses_camel_case() -> Result<()> {
        let response = RefreshResponse {
            token: "tok".to_string(),
            expires_in: 900,
        };
        let value = serde_json::to_value(&response)?;
        let expires = value
            .get("expiresIn")
            .and_then(serde_json::Value::as_i64)
            .context("missing expiresIn")?;
        assert_eq!(expires, 900);
        Ok(())
    }
}
