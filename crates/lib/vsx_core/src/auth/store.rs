//! Token store.
//!
//! Reads a user's tokens and replaces the token of one provider inside a
//! transaction. `replace` is the only way the persisted user record changes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Result;
use crate::models::auth::{AuthToken, User};

/// Persistence boundary of the token lifecycle.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load a user together with all stored tokens.
    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    /// Current token of `user_id` for `provider`. No transaction.
    async fn get(&self, user_id: i64, provider: &str) -> Result<Option<AuthToken>>;

    /// Set (or clear, with `None`) the token of `user_id` for `provider`.
    ///
    /// Runs in one transaction and returns the value that was set. A user
    /// that no longer exists yields `Ok(None)` and nothing is written.
    async fn replace(
        &self,
        user_id: i64,
        provider: &str,
        token: Option<AuthToken>,
    ) -> Result<Option<AuthToken>>;
}

/// In-process [`TokenStore`].
///
/// The write lock is held for the whole of `replace`, which makes each call
/// atomic the same way a database transaction does.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    users: RwLock<HashMap<i64, User>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a user record.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Delete a user record, returning it if present.
    pub async fn remove_user(&self, user_id: i64) -> Option<User> {
        self.users.write().await.remove(&user_id)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn get(&self, user_id: i64, provider: &str) -> Result<Option<AuthToken>> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .and_then(|user| user.token(provider).cloned()))
    }

    async fn replace(
        &self,
        user_id: i64,
        provider: &str,
        token: Option<AuthToken>,
    ) -> Result<Option<AuthToken>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(None);
        };
        match &token {
            Some(value) => {
                user.tokens.insert(provider.to_string(), value.clone());
            }
            None => {
                user.tokens.remove(provider);
            }
        }
        Ok(token)
    }
}
