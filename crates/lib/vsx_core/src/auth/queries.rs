//! Token-related database queries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::Result;
use super::store::TokenStore;
use crate::models::auth::{AuthToken, User};

type TokenRow = (
    String,
    String,
    Option<String>,
    Vec<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn token_from_row(row: TokenRow) -> (String, AuthToken) {
    let (provider, access_token, refresh_token, scopes, issued_at, expires_at) = row;
    (
        provider,
        AuthToken {
            access_token,
            refresh_token,
            scopes: scopes.into_iter().collect(),
            issued_at,
            expires_at,
        },
    )
}

/// Create a user, returning the new id.
pub async fn create_user(pool: &PgPool, login_name: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>("INSERT INTO users (login_name) VALUES ($1) RETURNING id")
        .bind(login_name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

/// Fetch a user and all of their stored tokens.
pub async fn find_user(pool: &PgPool, user_id: i64) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, (i64, String)>("SELECT id, login_name FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    let Some((id, login_name)) = row else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, TokenRow>(
        "SELECT provider, access_token, refresh_token, scopes, issued_at, expires_at \
         FROM auth_tokens \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let tokens: BTreeMap<String, AuthToken> = rows.into_iter().map(token_from_row).collect();
    Ok(Some(User {
        id,
        login_name,
        tokens,
    }))
}

/// Fetch the token of a user for one provider.
pub async fn find_token(pool: &PgPool, user_id: i64, provider: &str) -> Result<Option<AuthToken>> {
    let row = sqlx::query_as::<_, TokenRow>(
        "SELECT provider, access_token, refresh_token, scopes, issued_at, expires_at \
         FROM auth_tokens \
         WHERE user_id = $1 AND provider = $2",
    )
    .bind(user_id)
    .bind(provider)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| token_from_row(r).1))
}

/// Set or clear the token of a user for one provider in a single transaction.
///
/// The user row is locked first; if it is gone the transaction is rolled back
/// and `None` is returned.
pub async fn replace_token(
    pool: &PgPool,
    user_id: i64,
    provider: &str,
    token: Option<AuthToken>,
) -> Result<Option<AuthToken>> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        tx.rollback().await?;
        return Ok(None);
    }

    match &token {
        Some(value) => {
            sqlx::query(
                "INSERT INTO auth_tokens \
                     (user_id, provider, access_token, refresh_token, scopes, issued_at, expires_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (user_id, provider) DO UPDATE SET \
                     access_token = EXCLUDED.access_token, \
                     refresh_token = EXCLUDED.refresh_token, \
                     scopes = EXCLUDED.scopes, \
                     issued_at = EXCLUDED.issued_at, \
                     expires_at = EXCLUDED.expires_at",
            )
            .bind(user_id)
            .bind(provider)
            .bind(&value.access_token)
            .bind(&value.refresh_token)
            .bind(value.scopes.iter().cloned().collect::<Vec<String>>())
            .bind(value.issued_at)
            .bind(value.expires_at)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND provider = $2")
                .bind(user_id)
                .bind(provider)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(token)
}

/// [`TokenStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        find_user(&self.pool, user_id).await
    }

    async fn get(&self, user_id: i64, provider: &str) -> Result<Option<AuthToken>> {
        find_token(&self.pool, user_id, provider).await
    }

    async fn replace(
        &self,
        user_id: i64,
        provider: &str,
        token: Option<AuthToken>,
    ) -> Result<Option<AuthToken>> {
        replace_token(&self.pool, user_id, provider, token).await
    }
}
