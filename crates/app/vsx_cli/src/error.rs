use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("Config: {}", .0)]
    Config(#[from] vsx_core::config::ConfigError),

    #[error("Token: {}", .0)]
    Token(#[from] vsx_core::auth::TokenError),

    #[error("Sqlx: {}", .0)]
    Sqlx(#[from] sqlx::Error),

    #[error("Migrate: {}", .0)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Http: {}", .0)]
    Http(#[from] reqwest::Error),

    #[error("Json: {}", .0)]
    Json(#[from] serde_json::Error),
}
