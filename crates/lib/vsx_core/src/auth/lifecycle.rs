//! Token lifecycle manager.
//!
//! The entry points consumers use: [`TokenManager::update_tokens`] after a
//! login or revocation, and [`TokenManager::get_active_token`] whenever a
//! provider token is needed. Behaviour is selected by the provider's
//! [`TokenPolicy`].
//!
//! For a refreshable provider a token moves through three states:
//!
//! - `Absent --update_tokens(access)--> Valid`
//! - `Valid --now > expires_at--> Expired` (noticed on the next read)
//! - `Expired --get_active_token, refresh ok--> Valid`
//! - `Expired --get_active_token, refresh failed--> Absent`
//! - `Valid | Expired --update_tokens(None)--> Absent`
//!
//! There is no locking across calls. Two reads that see the same expired
//! token both refresh, and the later `replace` wins.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::Result;
use super::provider::{ProviderRegistry, TokenPolicy};
use super::refresh::TokenRefresher;
use super::store::TokenStore;
use crate::models::auth::{AuthToken, OAuthAccessToken, OAuthRefreshToken, User};

/// What [`TokenManager::update_tokens_outcome`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenUpdate {
    /// The token was stored and is returned.
    Stored(AuthToken),
    /// No access token was given; the stored token was removed.
    Cleared,
    /// The user does not exist (or vanished before the write).
    UserNotFound,
    /// The provider id is not registered. Nothing was written.
    UnknownProvider,
}

impl TokenUpdate {
    /// The stored token, if any.
    pub fn into_token(self) -> Option<AuthToken> {
        match self {
            TokenUpdate::Stored(token) => Some(token),
            _ => None,
        }
    }
}

/// Stores, refreshes, and serves per-user provider tokens.
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    providers: Arc<ProviderRegistry>,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            store,
            refresher,
            providers,
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Set or clear the token of a user for a provider.
    ///
    /// Returns the token that ended up stored. Missing users and unknown
    /// providers yield `Ok(None)`; use [`TokenManager::update_tokens_outcome`]
    /// to tell them apart.
    pub async fn update_tokens(
        &self,
        user_id: i64,
        provider: &str,
        access: Option<OAuthAccessToken>,
        refresh: Option<OAuthRefreshToken>,
    ) -> Result<Option<AuthToken>> {
        self.update_tokens_outcome(user_id, provider, access, refresh)
            .await
            .map(TokenUpdate::into_token)
    }

    /// Same as [`TokenManager::update_tokens`], reporting which path was taken.
    pub async fn update_tokens_outcome(
        &self,
        user_id: i64,
        provider: &str,
        access: Option<OAuthAccessToken>,
        refresh: Option<OAuthRefreshToken>,
    ) -> Result<TokenUpdate> {
        let Some(user) = self.store.find_user(user_id).await? else {
            debug!(user_id, provider, "Token update skipped: user not found");
            return Ok(TokenUpdate::UserNotFound);
        };

        let Some(policy) = self.providers.policy(provider) else {
            debug!(user_id, provider, "Token update skipped: unknown provider");
            return Ok(TokenUpdate::UnknownProvider);
        };

        let Some(access) = access else {
            self.store.replace(user.id, provider, None).await?;
            info!(user_id, provider, "Token cleared");
            return Ok(TokenUpdate::Cleared);
        };

        let token = match policy {
            TokenPolicy::Static => AuthToken::from_access(&access),
            TokenPolicy::Refreshable => match refresh {
                Some(refresh) => {
                    AuthToken::from_access(&access).with_refresh_token(refresh.token_value)
                }
                None => self.exchange_for_refreshable(user_id, provider, &access).await,
            },
        };

        match self.store.replace(user.id, provider, Some(token)).await? {
            Some(stored) => {
                debug!(user_id, provider, "Token stored");
                Ok(TokenUpdate::Stored(stored))
            }
            None => {
                debug!(user_id, provider, "Token update skipped: user removed");
                Ok(TokenUpdate::UserNotFound)
            }
        }
    }

    /// A token that arrived without a refresh credential is refreshed right
    /// away. On failure the supplied token is kept as is.
    async fn exchange_for_refreshable(
        &self,
        user_id: i64,
        provider: &str,
        access: &OAuthAccessToken,
    ) -> AuthToken {
        let supplied = AuthToken::from_access(access);
        match self.refresher.refresh(provider, &supplied).await {
            Ok(pair) => AuthToken::from(pair),
            Err(e) => {
                warn!(user_id, provider, error = %e, "Initial refresh failed; storing supplied token");
                supplied
            }
        }
    }

    /// Token currently usable for `provider`, refreshing it if it expired.
    ///
    /// Not a pure read: an expired refreshable token is replaced by the
    /// refreshed one, or cleared when the refresh fails.
    pub async fn get_active_token(&self, user: &User, provider: &str) -> Result<Option<AuthToken>> {
        match self.providers.policy(provider) {
            None => {
                debug!(user_id = user.id, provider, "Unknown provider");
                Ok(None)
            }
            Some(TokenPolicy::Static) => Ok(user.token(provider).cloned()),
            Some(TokenPolicy::Refreshable) => {
                let Some(token) = user.token(provider) else {
                    return Ok(None);
                };
                if !token.is_expired_at(Utc::now()) {
                    return Ok(Some(token.clone()));
                }

                debug!(user_id = user.id, provider, "Token expired; refreshing");
                match self.refresher.refresh(provider, token).await {
                    Ok(pair) => {
                        self.update_tokens(user.id, provider, Some(pair.access), Some(pair.refresh))
                            .await
                    }
                    Err(e) => {
                        info!(user_id = user.id, provider, error = %e, "Refresh failed; clearing token");
                        self.update_tokens(user.id, provider, None, None).await
                    }
                }
            }
        }
    }

    /// [`TokenManager::get_active_token`] for a user loaded by id.
    pub async fn get_active_token_by_id(
        &self,
        user_id: i64,
        provider: &str,
    ) -> Result<Option<AuthToken>> {
        match self.store.find_user(user_id).await? {
            Some(user) => self.get_active_token(&user, provider).await,
            None => Ok(None),
        }
    }
}
