//! Authentication domain models.
//!
//! `OAuthAccessToken` / `OAuthRefreshToken` are what a login flow hands over;
//! `AuthToken` is the record persisted per user and provider.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access token as issued by an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthAccessToken {
    pub token_value: String,
    pub scopes: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthAccessToken {
    /// Bearer token issued now with no scopes and no known expiry.
    pub fn new(token_value: impl Into<String>) -> Self {
        Self {
            token_value: token_value.into(),
            scopes: BTreeSet::new(),
            issued_at: Utc::now(),
            expires_at: None,
        }
    }
}

/// Refresh token as issued by an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRefreshToken {
    pub token_value: String,
    pub issued_at: Option<DateTime<Utc>>,
}

impl OAuthRefreshToken {
    pub fn new(token_value: impl Into<String>) -> Self {
        Self {
            token_value: token_value.into(),
            issued_at: None,
        }
    }
}

/// Result of a successful `refresh_token` grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: OAuthAccessToken,
    pub refresh: OAuthRefreshToken,
}

/// Token record stored for a user and provider.
///
/// Values are replaced wholesale; the builder methods are only meant for
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scopes: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    /// `None` means the provider did not report an expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// Build a record from an access token, without a refresh credential.
    pub fn from_access(access: &OAuthAccessToken) -> Self {
        Self {
            access_token: access.token_value.clone(),
            refresh_token: None,
            scopes: access.scopes.clone(),
            issued_at: access.issued_at,
            expires_at: access.expires_at,
        }
    }

    /// Attach a refresh credential.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// True only when an expiry is known and `now` is strictly after it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

impl From<TokenPair> for AuthToken {
    fn from(pair: TokenPair) -> Self {
        AuthToken::from_access(&pair.access).with_refresh_token(pair.refresh.token_value)
    }
}

/// Registry user with the tokens currently stored for each provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login_name: String,
    /// At most one token per provider id.
    pub tokens: BTreeMap<String, AuthToken>,
}

impl User {
    pub fn new(id: i64, login_name: impl Into<String>) -> Self {
        Self {
            id,
            login_name: login_name.into(),
            tokens: BTreeMap::new(),
        }
    }

    /// Token stored for `provider`, if any.
    pub fn token(&self, provider: &str) -> Option<&AuthToken> {
        self.tokens.get(provider)
    }
}
