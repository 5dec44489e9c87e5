//! Token subsystem configuration.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::auth::provider::RefreshCredential;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/openvsx";
const DEFAULT_GITHUB_TOKEN_URI: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_ECLIPSE_TOKEN_URI: &str = "https://accounts.eclipse.org/oauth2/token";
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// OAuth client credentials for one provider.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: Url,
}

/// Configuration for the token lifecycle subsystem.
#[derive(Clone, Debug)]
pub struct TokenConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    pub github: ClientSettings,
    pub eclipse: ClientSettings,
    /// Which stored value is sent as `refresh_token` to the Eclipse endpoint.
    pub eclipse_refresh_credential: RefreshCredential,
    /// Upper bound for a single refresh round trip.
    pub refresh_timeout: Duration,
}

impl TokenConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                     | Default                                        |
    /// |------------------------------|------------------------------------------------|
    /// | `DATABASE_URL`               | `postgres://localhost:5432/openvsx`            |
    /// | `GITHUB_CLIENT_ID`           | empty                                          |
    /// | `GITHUB_CLIENT_SECRET`       | empty                                          |
    /// | `GITHUB_TOKEN_URI`           | `https://github.com/login/oauth/access_token`  |
    /// | `ECLIPSE_CLIENT_ID`          | empty                                          |
    /// | `ECLIPSE_CLIENT_SECRET`      | empty                                          |
    /// | `ECLIPSE_TOKEN_URI`          | `https://accounts.eclipse.org/oauth2/token`    |
    /// | `ECLIPSE_REFRESH_CREDENTIAL` | `access_token`                                 |
    /// | `TOKEN_REFRESH_TIMEOUT_SECS` | `30`                                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TokenConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let github = ClientSettings {
            client_id: var_or("GITHUB_CLIENT_ID", ""),
            client_secret: var_or("GITHUB_CLIENT_SECRET", ""),
            token_uri: parse_url(
                "GITHUB_TOKEN_URI",
                &var_or("GITHUB_TOKEN_URI", DEFAULT_GITHUB_TOKEN_URI),
            )?,
        };
        let eclipse = ClientSettings {
            client_id: var_or("ECLIPSE_CLIENT_ID", ""),
            client_secret: var_or("ECLIPSE_CLIENT_SECRET", ""),
            token_uri: parse_url(
                "ECLIPSE_TOKEN_URI",
                &var_or("ECLIPSE_TOKEN_URI", DEFAULT_ECLIPSE_TOKEN_URI),
            )?,
        };

        let eclipse_refresh_credential = match lookup("ECLIPSE_REFRESH_CREDENTIAL") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "ECLIPSE_REFRESH_CREDENTIAL",
                    value,
                })?,
            None => RefreshCredential::default(),
        };

        let refresh_timeout = match lookup("TOKEN_REFRESH_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue {
                        var: "TOKEN_REFRESH_TIMEOUT_SECS",
                        value,
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS),
        };

        Ok(Self {
            database_url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            github,
            eclipse,
            eclipse_refresh_credential,
            refresh_timeout,
        })
    }
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { var, source })
}
