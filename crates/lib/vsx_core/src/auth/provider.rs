//! Provider registry.
//!
//! Maps a provider id (`"github"`, `"eclipse"`, ...) to its token policy and
//! OAuth client registration. The lifecycle manager dispatches on the policy,
//! so adding a provider is a registration, not a code change.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::config::{ClientSettings, TokenConfig};

/// GitHub provider id.
pub const GITHUB: &str = "github";

/// Eclipse provider id.
pub const ECLIPSE: &str = "eclipse";

/// How the lifecycle manager treats tokens of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Stored as given, served without a freshness check.
    Static,
    /// Refreshed lazily on expiry and proactively when stored without a
    /// refresh credential.
    Refreshable,
}

/// Stored value sent as `refresh_token` in a refresh grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshCredential {
    /// The stored access token value. This is what the Eclipse integration
    /// has always sent.
    #[default]
    AccessToken,
    /// The stored refresh token, falling back to the access token when none
    /// is stored.
    RefreshToken,
}

impl RefreshCredential {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshCredential::AccessToken => "access_token",
            RefreshCredential::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for RefreshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshCredential {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "access_token" => Ok(RefreshCredential::AccessToken),
            "refresh_token" => Ok(RefreshCredential::RefreshToken),
            other => Err(format!("unknown refresh credential: {other}")),
        }
    }
}

/// OAuth client registration of a provider.
#[derive(Clone)]
pub struct ClientRegistration {
    pub token_uri: Url,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("token_uri", &self.token_uri.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl From<&ClientSettings> for ClientRegistration {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            token_uri: settings.token_uri.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        }
    }
}

/// Everything the registry knows about one provider.
#[derive(Debug, Clone)]
pub struct ProviderEntry {
    pub policy: TokenPolicy,
    pub registration: Option<ClientRegistration>,
    pub refresh_credential: RefreshCredential,
}

impl ProviderEntry {
    pub fn fixed(registration: Option<ClientRegistration>) -> Self {
        Self {
            policy: TokenPolicy::Static,
            registration,
            refresh_credential: RefreshCredential::default(),
        }
    }

    pub fn refreshable(registration: ClientRegistration, credential: RefreshCredential) -> Self {
        Self {
            policy: TokenPolicy::Refreshable,
            registration: Some(registration),
            refresh_credential: credential,
        }
    }
}

/// Read-only lookup of provider entries by id.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `github` (static) and `eclipse` (refreshable) built
    /// from configuration.
    pub fn from_config(config: &TokenConfig) -> Self {
        let mut registry = Self::new();
        registry.register(
            GITHUB,
            ProviderEntry::fixed(Some(ClientRegistration::from(&config.github))),
        );
        registry.register(
            ECLIPSE,
            ProviderEntry::refreshable(
                ClientRegistration::from(&config.eclipse),
                config.eclipse_refresh_credential,
            ),
        );
        registry
    }

    /// Add or replace the entry for `id`.
    pub fn register(&mut self, id: impl Into<String>, entry: ProviderEntry) {
        self.entries.insert(id.into(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&ProviderEntry> {
        self.entries.get(id)
    }

    pub fn policy(&self, id: &str) -> Option<TokenPolicy> {
        self.get(id).map(|entry| entry.policy)
    }

    pub fn registration(&self, id: &str) -> Option<&ClientRegistration> {
        self.get(id).and_then(|entry| entry.registration.as_ref())
    }

    /// Registered provider ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(uri: &str) -> ClientRegistration {
        ClientRegistration {
            token_uri: Url::parse(uri).unwrap(),
            client_id: "id".into(),
            client_secret: "secret".into(),
        }
    }

    #[test]
    fn from_config_registers_known_providers() {
        let config = TokenConfig::from_lookup(|_| None).unwrap();
        let registry = ProviderRegistry::from_config(&config);

        assert_eq!(registry.ids(), vec![ECLIPSE, GITHUB]);
        assert_eq!(registry.policy(GITHUB), Some(TokenPolicy::Static));
        assert_eq!(registry.policy(ECLIPSE), Some(TokenPolicy::Refreshable));
        assert_eq!(
            registry.registration(ECLIPSE).map(|r| r.token_uri.as_str()),
            Some("https://accounts.eclipse.org/oauth2/token")
        );
    }

    #[test]
    fn unknown_provider_has_no_entry() {
        let registry = ProviderRegistry::new();
        assert!(registry.get("gitlab").is_none());
        assert!(registry.policy("gitlab").is_none());
        assert!(registry.registration("gitlab").is_none());
    }

    #[test]
    fn register_adds_provider_without_code_change() {
        let mut registry = ProviderRegistry::new();
        registry.register(
            "gitlab",
            ProviderEntry::refreshable(
                registration("https://gitlab.example/oauth/token"),
                RefreshCredential::RefreshToken,
            ),
        );
        assert_eq!(registry.policy("gitlab"), Some(TokenPolicy::Refreshable));
        assert_eq!(
            registry.get("gitlab").map(|e| e.refresh_credential),
            Some(RefreshCredential::RefreshToken)
        );
    }

    #[test]
    fn debug_output_redacts_client_secret() {
        let rendered = format!("{:?}", registration("https://example.org/token"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"secret\""));
    }

    #[test]
    fn refresh_credential_parses_both_forms() {
        assert_eq!(
            "access_token".parse::<RefreshCredential>(),
            Ok(RefreshCredential::AccessToken)
        );
        assert_eq!(
            " refresh_token ".parse::<RefreshCredential>(),
            Ok(RefreshCredential::RefreshToken)
        );
        assert!("bearer".parse::<RefreshCredential>().is_err());
    }
}
