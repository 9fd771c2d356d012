//! Database helpers for users and refresh tokens.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{Role, UserResponse};
use super::utils::is_unique_violation;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(crate) enum SignupOutcome {
    Created(UserRecord),
    Conflict,
}

/// A user row; the password hash stays inside the auth module.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub(crate) password_hash: String,
    pub role: Role,
    pub created_at_unix: i64,
}

impl UserRecord {
    #[must_use]
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id.to_string(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at_unix,
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, \
     EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix";

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: Role::from_db(row.get::<String, _>("role").as_str()),
        created_at_unix: row.get("created_at_unix"),
    }
}

/// Look up a user by normalized email (used by login).
pub(crate) async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Resolve a token's embedded user id against the store.
pub(crate) async fn lookup_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| user_from_row(&row)))
}

pub(crate) async fn insert_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let query = format!(
        "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
         RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(user_from_row(&row))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(crate) async fn list_users(pool: &PgPool) -> Result<Vec<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    Ok(rows.iter().map(user_from_row).collect())
}

/// Promote a user to admin; returns the updated row or `None` if unknown.
pub(crate) async fn promote_user(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!(
        "UPDATE users SET role = 'admin' WHERE id = $1 RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to promote user")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Persist a refresh token hash so the session can be revoked later.
pub(crate) async fn insert_refresh_token(
    pool: &PgPool,
    token_hash: &[u8],
    user_id: Uuid,
    expires_at_unix: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO refresh_tokens (token_hash, user_id, expires_at)
        VALUES ($1, $2, TO_TIMESTAMP($3))
        ON CONFLICT (token_hash) DO UPDATE SET expires_at = EXCLUDED.expires_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at_unix)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert refresh token")?;
    Ok(())
}

/// A refresh token is live only if its row matches token hash + user id and
/// has not expired. Deleting the row revokes the session.
pub(crate) async fn match_refresh_token(
    pool: &PgPool,
    token_hash: &[u8],
    user_id: Uuid,
) -> Result<bool> {
    let query = r"
        SELECT 1 AS live
        FROM refresh_tokens
        WHERE token_hash = $1
          AND user_id = $2
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to match refresh token")?;

    Ok(row.is_some())
}

pub(crate) async fn delete_refresh_token(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM refresh_tokens WHERE token_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete refresh token")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SignupOutcome, UserRecord};
    use crate::api::handlers::auth::types::Role;
    use uuid::Uuid;

    fn record() -> UserRecord {
        UserRecord {
            id: Uuid::nil(),
            name: "Bob".to_string(),
            email: "bob@buildmart.dev".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::User,
            created_at_unix: 1_700_000_000,
        }
    }

    #[test]
    fn signup_outcome_debug_names() {
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
        assert!(format!("{:?}", SignupOutcome::Created(record())).starts_with("Created"));
    }

    #[test]
    fn user_record_response_hides_password_hash() {
        let response = record().to_response();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("bob@buildmart.dev"));
    }
}
