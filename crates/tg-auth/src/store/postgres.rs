//! PostgreSQL-backed stores.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

use super::{CredentialStore, TokenStore};
use crate::domain::{NewUser, Token, TokenKind, User};
use crate::error::{AuthError, Result};

/// Implements both store contracts over one connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                pass_hash TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                phone_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
                permissions TEXT[] NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                token TEXT PRIMARY KEY,
                exp_time TIMESTAMPTZ NOT NULL,
                token_type INTEGER NOT NULL,
                username TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Auth schema initialized");
        Ok(())
    }
}

fn exactly_one(rows_affected: u64, username: &str) -> Result<()> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(AuthError::user_not_found(username))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl CredentialStore for PostgresStore {
    async fn create_user(&self, user: &NewUser) -> Result<()> {
        let permissions: Vec<String> = crate::domain::default_permissions().into_iter().collect();

        let result = sqlx::query(
            "INSERT INTO users (username, pass_hash, phone_number, phone_confirmed, permissions) VALUES ($1, $2, $3, FALSE, $4)",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(&permissions)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AuthError::duplicate_user(&user.username)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, username: &str) -> Result<User> {
        let row = sqlx::query(
            "SELECT username, pass_hash, phone_number, phone_confirmed, permissions FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AuthError::user_not_found(username))?;

        let permissions: Vec<String> = row.try_get("permissions")?;
        Ok(User {
            username: row.try_get("username")?,
            password_hash: row.try_get("pass_hash")?,
            phone_number: row.try_get("phone_number")?,
            phone_confirmed: row.try_get("phone_confirmed")?,
            permissions: permissions.into_iter().collect(),
        })
    }

    async fn confirm_phone(&self, username: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET phone_confirmed = TRUE WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        exactly_one(result.rows_affected(), username)
    }

    async fn set_permissions(&self, username: &str, permissions: &BTreeSet<String>) -> Result<()> {
        let permissions: Vec<String> = permissions.iter().cloned().collect();
        let result = sqlx::query("UPDATE users SET permissions = $1 WHERE username = $2")
            .bind(&permissions)
            .bind(username)
            .execute(&self.pool)
            .await?;
        exactly_one(result.rows_affected(), username)
    }
}

#[async_trait]
impl TokenStore for PostgresStore {
    async fn create_token(&self, token: &Token) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO tokens (token, exp_time, token_type, username) VALUES ($1, $2, $3, $4)",
        )
        .bind(&token.value)
        .bind(token.expires_at)
        .bind(token.kind.code())
        .bind(&token.username)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AuthError::DuplicateToken),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_token(&self, value: &str) -> Result<Token> {
        let row = sqlx::query(
            "SELECT token, exp_time, token_type, username FROM tokens WHERE token = $1",
        )
        .bind(value)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::TokenNotFound)?;

        let code: i32 = row.try_get("token_type")?;
        let kind = TokenKind::from_code(code)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown token_type {}", code).into()))?;
        let expires_at: DateTime<Utc> = row.try_get("exp_time")?;

        Ok(Token {
            value: row.try_get("token")?,
            expires_at,
            kind,
            username: row.try_get("username")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_row() {
        assert!(exactly_one(1, "alice").is_ok());
        assert!(matches!(exactly_one(0, "alice"), Err(AuthError::UserNotFound { .. })));
        assert!(matches!(exactly_one(2, "alice"), Err(AuthError::UserNotFound { .. })));
    }

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
