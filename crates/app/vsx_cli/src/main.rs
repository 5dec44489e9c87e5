// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands, TokenCommands, TokenTarget};
use serde::Serialize;
use sqlx::PgPool;
use vsx_core::auth::provider::ProviderRegistry;
use vsx_core::auth::queries::PgTokenStore;
use vsx_core::auth::refresh::HttpTokenRefresher;
use vsx_core::auth::{TokenManager, TokenUpdate};
use vsx_core::config::TokenConfig;
use vsx_core::models::auth::AuthToken;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::Migrate => {
            let config = TokenConfig::from_env()?;
            runtime()?.block_on(async {
                let pool = PgPool::connect(&config.database_url).await?;
                vsx_core::migrate::migrate(&pool).await?;
                log::info!("Migrations applied");
                Ok::<_, Error>(())
            })?;
        }
        Commands::Token { command } => {
            let config = TokenConfig::from_env()?;
            runtime()?.block_on(run_token_command(config, command))?;
        }
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

async fn token_manager(config: &TokenConfig) -> Result<TokenManager> {
    let pool = PgPool::connect(&config.database_url).await?;
    let providers = Arc::new(ProviderRegistry::from_config(config));
    let refresher = HttpTokenRefresher::new(providers.clone(), config.refresh_timeout)?;
    Ok(TokenManager::new(
        Arc::new(PgTokenStore::new(pool)),
        Arc::new(refresher),
        providers,
    ))
}

fn check_provider(manager: &TokenManager, target: &TokenTarget) -> Result<()> {
    if manager.providers().get(&target.provider).is_none() {
        return Err(Error::Custom(format!(
            "Unknown provider '{}' (known: {})",
            target.provider,
            manager.providers().ids().join(", ")
        )));
    }
    Ok(())
}

async fn run_token_command(config: TokenConfig, command: TokenCommands) -> Result<()> {
    let manager = token_manager(&config).await?;

    match command {
        TokenCommands::Show { target, reveal } => {
            check_provider(&manager, &target)?;
            match manager
                .get_active_token_by_id(target.user, &target.provider)
                .await?
            {
                Some(token) => {
                    let view = TokenView::new(&target.provider, &token, reveal);
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                None => println!("No active {} token for user {}", target.provider, target.user),
            }
        }
        TokenCommands::Revoke { target } => {
            check_provider(&manager, &target)?;
            match manager
                .update_tokens_outcome(target.user, &target.provider, None, None)
                .await?
            {
                TokenUpdate::UserNotFound => {
                    return Err(Error::Custom(format!("User not found: {}", target.user)));
                }
                _ => println!("Revoked {} token for user {}", target.provider, target.user),
            }
        }
    }

    Ok(())
}

/// Printable token with secrets masked unless revealed.
#[derive(Serialize)]
struct TokenView {
    provider: String,
    access_token: String,
    refresh_token: Option<String>,
    scopes: Vec<String>,
    issued_at: chrono::DateTime<chrono::Utc>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TokenView {
    fn new(provider: &str, token: &AuthToken, reveal: bool) -> Self {
        let show = |value: &str| {
            if reveal {
                value.to_string()
            } else {
                mask(value)
            }
        };
        Self {
            provider: provider.to_string(),
            access_token: show(&token.access_token),
            refresh_token: token.refresh_token.as_deref().map(show),
            scopes: token.scopes.iter().cloned().collect(),
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        }
    }
}

fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}
