//! Token refresh client.
//!
//! Performs the OAuth `refresh_token` grant against a provider's token
//! endpoint. One request per call, no retries. Failures are logged with the
//! endpoint URL and returned; callers treat them as recoverable.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use super::provider::{ProviderRegistry, RefreshCredential};
use crate::models::auth::{AuthToken, OAuthAccessToken, OAuthRefreshToken, TokenPair};

/// Refresh grant errors.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("No client registration for provider: {0}")]
    UnknownProvider(String),

    #[error("Token request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Token endpoint {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Malformed token response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

/// Exchanges a stored token for a fresh access/refresh pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Run the refresh grant for `provider`, using `token` as the source of
    /// the refresh credential.
    async fn refresh(&self, provider: &str, token: &AuthToken) -> Result<TokenPair, RefreshError>;
}

#[derive(Serialize)]
struct RefreshGrantRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshGrantResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

/// Pick the value sent as `refresh_token`.
pub fn refresh_credential_value(token: &AuthToken, credential: RefreshCredential) -> &str {
    match credential {
        RefreshCredential::AccessToken => &token.access_token,
        RefreshCredential::RefreshToken => token
            .refresh_token
            .as_deref()
            .unwrap_or(&token.access_token),
    }
}

/// [`TokenRefresher`] that talks to the provider's token endpoint over HTTP.
pub struct HttpTokenRefresher {
    client: Client,
    providers: Arc<ProviderRegistry>,
}

impl HttpTokenRefresher {
    /// Build a refresher whose requests are bounded by `timeout`.
    pub fn new(providers: Arc<ProviderRegistry>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, providers))
    }

    /// Build a refresher around an existing HTTP client.
    pub fn with_client(client: Client, providers: Arc<ProviderRegistry>) -> Self {
        Self { client, providers }
    }

    async fn exchange(&self, provider: &str, token: &AuthToken) -> Result<TokenPair, RefreshError> {
        let entry = self
            .providers
            .get(provider)
            .ok_or_else(|| RefreshError::UnknownProvider(provider.to_string()))?;
        let registration = entry
            .registration
            .as_ref()
            .ok_or_else(|| RefreshError::UnknownProvider(provider.to_string()))?;
        let url = registration.token_uri.as_str();

        let body = RefreshGrantRequest {
            grant_type: "refresh_token",
            client_id: &registration.client_id,
            client_secret: &registration.client_secret,
            refresh_token: refresh_credential_value(token, entry.refresh_credential),
        };

        debug!(provider, token_uri = url, "Requesting token refresh");

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|source| RefreshError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|source| RefreshError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(RefreshError::Status {
                url: url.to_string(),
                status,
                body: text,
            });
        }

        let parsed: RefreshGrantResponse =
            serde_json::from_str(&text).map_err(|e| RefreshError::InvalidResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let issued_at = Utc::now();
        let expires_at = chrono::Duration::try_seconds(parsed.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| RefreshError::InvalidResponse {
                url: url.to_string(),
                reason: format!("expires_in out of range: {}", parsed.expires_in),
            })?;

        let scopes: BTreeSet<String> = parsed
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(TokenPair {
            access: OAuthAccessToken {
                token_value: parsed.access_token,
                scopes,
                issued_at,
                expires_at: Some(expires_at),
            },
            refresh: OAuthRefreshToken {
                token_value: parsed.refresh_token,
                issued_at: Some(issued_at),
            },
        })
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, provider: &str, token: &AuthToken) -> Result<TokenPair, RefreshError> {
        let result = self.exchange(provider, token).await;
        if let Err(e) = &result {
            error!(provider, error = %e, "Token refresh failed");
        }
        result
    }
}
